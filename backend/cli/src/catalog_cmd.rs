//! `policyforge catalog`: inspect the rule catalog.

use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Args;
use policyforge_catalog::Catalog;
use policyforge_config::PolicyforgeConfig;
use policyforge_core::{provider_prefix, Provider, ResourceKind, RuleSource};

use crate::context::load_catalog;
use crate::terminal_output::{render_table, Column};

#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// List the types of one provider
    #[arg(short, long)]
    pub provider: Option<Provider>,

    /// Show the rules of one resource or data source type
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub type_name: Option<String>,
}

pub async fn run(args: CatalogArgs, config: &PolicyforgeConfig) -> Result<ExitCode> {
    let catalog = load_catalog(config).await?;
    let out = match (&args.type_name, args.provider) {
        (Some(type_name), _) => describe_type(&catalog, type_name)?,
        (None, Some(provider)) => list_types(&catalog, provider),
        (None, None) => summary(&catalog),
    };
    print!("{out}");
    Ok(ExitCode::SUCCESS)
}

fn rule_count(catalog: &Catalog, provider: Provider, type_name: &str, kind: ResourceKind) -> usize {
    catalog.rules(provider, type_name, kind).map_or(0, <[_]>::len)
}

fn summary(catalog: &Catalog) -> String {
    let rows: Vec<Vec<String>> = Provider::ALL
        .iter()
        .map(|&provider| {
            let resources = catalog.types(provider, ResourceKind::Resource);
            let data = catalog.types(provider, ResourceKind::DataSource);
            let rules: usize = resources
                .iter()
                .map(|t| rule_count(catalog, provider, t, ResourceKind::Resource))
                .chain(data.iter().map(|t| rule_count(catalog, provider, t, ResourceKind::DataSource)))
                .sum();
            vec![
                provider.to_string(),
                resources.len().to_string(),
                data.len().to_string(),
                rules.to_string(),
            ]
        })
        .collect();
    render_table(
        &[
            Column::left("Provider"),
            Column::right("Resources"),
            Column::right("Data sources"),
            Column::right("Rules"),
        ],
        &rows,
    )
}

fn list_types(catalog: &Catalog, provider: Provider) -> String {
    let mut rows = Vec::new();
    for kind in [ResourceKind::Resource, ResourceKind::DataSource] {
        for type_name in catalog.types(provider, kind) {
            rows.push(vec![
                type_name.to_string(),
                kind.to_string(),
                rule_count(catalog, provider, type_name, kind).to_string(),
            ]);
        }
    }
    render_table(&[Column::left("Type"), Column::left("Kind"), Column::right("Rules")], &rows)
}

fn describe_type(catalog: &Catalog, type_name: &str) -> Result<String> {
    let prefix = provider_prefix(type_name);
    let Some(provider) = Provider::from_prefix(prefix) else {
        bail!("provider '{prefix}' not supported");
    };

    let mut out = String::new();
    for kind in [ResourceKind::Resource, ResourceKind::DataSource] {
        let Some(rules) = catalog.rules(provider, type_name, kind) else {
            continue;
        };
        out.push_str(&format!("{kind} {type_name}\n"));
        for rule in rules {
            if rule.unconditional() {
                out.push_str("  always:\n");
            } else {
                let conditions: Vec<String> = rule
                    .conditions
                    .iter()
                    .map(|c| serde_json::to_string(c).unwrap_or_else(|_| c.path().to_string()))
                    .collect();
                out.push_str(&format!("  when {}:\n", conditions.join(" and ")));
            }
            if rule.actions.is_empty() {
                out.push_str("    (no permissions)\n");
            }
            for action in &rule.actions {
                out.push_str(&format!("    {action}\n"));
            }
        }
    }
    if out.is_empty() {
        bail!("{type_name} not implemented");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> &'static Catalog {
        Catalog::builtin().unwrap()
    }

    #[test]
    fn summary_lists_every_provider() {
        let table = summary(catalog());
        for provider in ["aws", "gcp", "azure"] {
            assert!(table.contains(provider), "{table}");
        }
    }

    #[test]
    fn lists_types_of_one_provider() {
        let table = list_types(catalog(), Provider::Gcp);
        assert!(table.contains("google_storage_bucket"));
        assert!(!table.contains("aws_"));
    }

    #[test]
    fn describes_both_kinds_of_a_type() {
        let text = describe_type(catalog(), "aws_s3_bucket").unwrap();
        assert!(text.contains("resource aws_s3_bucket\n"));
        assert!(text.contains("data aws_s3_bucket\n"));
        assert!(text.contains("    s3:CreateBucket\n"));
    }

    #[test]
    fn unknown_types_are_errors() {
        assert!(describe_type(catalog(), "aws_quantum_annealer").is_err());
        assert!(describe_type(catalog(), "oci_core_vcn").is_err());
    }
}
