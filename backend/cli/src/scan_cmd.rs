//! `policyforge scan`: synthesize least-privilege policies for a codebase.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use policyforge_config::PolicyforgeConfig;
use policyforge_core::{CanonicalPolicy, Provider};
use policyforge_engine::{render, to_document, RenderFormat, ScanReport};
use serde_json::{Map, Value};
use tracing::info;

use crate::context::{self, RecordSource};
use crate::terminal_output::{note_info, note_success, note_warn, supports_color, BOLD, RESET};

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Terraform file or directory to scan
    #[arg(required_unless_present = "records")]
    pub path: Option<PathBuf>,

    /// Output format: json, text or terraform
    #[arg(short, long)]
    pub output: Option<RenderFormat>,

    /// Only emit the policy of this provider
    #[arg(short, long)]
    pub provider: Option<Provider>,

    /// Read pre-parsed resource records (JSON) instead of Terraform sources
    #[arg(long, value_name = "FILE")]
    pub records: Option<PathBuf>,

    /// One statement per service namespace
    #[arg(long)]
    pub group_by_service: bool,

    /// Resource scope for every statement (repeatable); defaults to "*"
    #[arg(long = "resource", value_name = "ARN")]
    pub resources: Vec<String>,

    /// Directory name to skip (repeatable)
    #[arg(short, long = "exclude", value_name = "DIR")]
    pub excludes: Vec<String>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Write the policies to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub write: Option<PathBuf>,
}

pub async fn run(args: ScanArgs, config: &PolicyforgeConfig) -> Result<ExitCode> {
    let source = RecordSource::from_args(args.path.as_deref(), args.records.as_deref())?;
    let scan_options = context::scan_options(config, args.recursive, &args.excludes);
    let records = context::collect_records(&source, &scan_options).await?;

    let catalog = context::load_catalog(config).await?;
    let synthesis = context::synthesize(&catalog, &records, &source.label());

    let options = context::canonicalize_options(config, args.group_by_service, &args.resources);
    let policies: Vec<CanonicalPolicy> = synthesis
        .policies(&options)
        .into_iter()
        .filter(|p| args.provider.map_or(true, |wanted| p.provider == wanted))
        .collect();

    let format = args.output.unwrap_or_else(|| config.render_format());
    let rendered = render_all(&policies, format, config.policy_name())?;

    if policies.is_empty() {
        note_warn("No permissions required by the scanned resources");
    } else if let Some(path) = &args.write {
        tokio::fs::write(path, rendered.as_bytes())
            .await
            .with_context(|| format!("Failed to write policy file: {}", path.display()))?;
        note_success(&format!("Wrote {} policy document(s) to {}", policies.len(), path.display()));
    } else {
        print!("{rendered}");
    }

    print_summary(&synthesis.report);
    info!(
        records = records.len(),
        policies = policies.len(),
        format = %format,
        "Scan finished"
    );
    Ok(ExitCode::SUCCESS)
}

/// Every policy rendered in `format`, separated by a blank line.
///
/// Several JSON documents are emitted as one object keyed by provider so the
/// output stays a single parseable document.
pub fn render_all(policies: &[CanonicalPolicy], format: RenderFormat, name: &str) -> Result<String> {
    if format == RenderFormat::Json && policies.len() > 1 {
        let mut by_provider = Map::new();
        for policy in policies {
            by_provider.insert(policy.provider.to_string(), to_document(policy, name)?);
        }
        let mut out = serde_json::to_string_pretty(&Value::Object(by_provider))
            .context("Failed to serialize policy documents")?;
        out.push('\n');
        return Ok(out);
    }
    let mut documents = Vec::with_capacity(policies.len());
    for policy in policies {
        documents.push(render(policy, format, name)?);
    }
    Ok(documents.join("\n"))
}

fn print_summary(report: &ScanReport) {
    let heading = format!(
        "{} resources: {} resolved, {} skipped, {} unresolved",
        report.total(),
        report.resolved.len(),
        report.skipped.len(),
        report.unresolved.len()
    );
    if supports_color() {
        eprintln!("\n{BOLD}{heading}{RESET}");
    } else {
        eprintln!("\n{heading}");
    }

    if report.unresolved.is_empty() {
        return;
    }
    note_info(&format!(
        "{} resource type(s) without permission data: {}",
        report.unresolved_types().len(),
        report.unresolved_types().join(", ")
    ));
    for unresolved in &report.unresolved {
        eprintln!("  {}: {}", unresolved.address, unresolved.reason);
    }
}
