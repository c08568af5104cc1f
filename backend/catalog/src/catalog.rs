//! Rule catalog: provider-partitioned, read-only lookup from
//! `(provider, type, kind)` to declarative permission rules.
//!
//! Catalog sources are YAML documents, one per provider:
//!
//! ```yaml
//! provider: aws
//! resource:
//!   aws_s3_bucket:
//!     - actions: [s3:CreateBucket, s3:DeleteBucket]
//!     - when:
//!         - { op: present, path: tags }
//!       actions: [s3:PutBucketTagging]
//! data:
//!   aws_s3_bucket:
//!     - actions: [s3:ListBucket]
//! ```
//!
//! Every entry under a type becomes one [`PermissionRule`]; all entries whose
//! `when` conditions hold contribute their actions.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::{Lazy, OnceCell};
use policyforge_core::{Condition, PermissionRule, PolicyError, Provider, ResourceKind, RuleSource};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("aws.yaml", include_str!("../data/aws.yaml")),
    ("gcp.yaml", include_str!("../data/gcp.yaml")),
    ("azure.yaml", include_str!("../data/azure.yaml")),
];

static BUILTIN: OnceCell<Catalog> = OnceCell::new();

static AWS_ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+:[A-Za-z0-9*]+$").unwrap());
static GCP_ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(\.[A-Za-z0-9]+){2,}$").unwrap());
static AZURE_ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Microsoft\.[A-Za-z]+(/[A-Za-z0-9*]+)+$").unwrap());

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    provider: Provider,
    #[serde(default)]
    resource: BTreeMap<String, Vec<RuleSpec>>,
    #[serde(default)]
    data: BTreeMap<String, Vec<RuleSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSpec {
    #[serde(default)]
    when: Vec<Condition>,
    /// Empty for declarations known to need no permissions.
    #[serde(default)]
    actions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct ProviderCatalog {
    resources: HashMap<String, Vec<PermissionRule>>,
    data: HashMap<String, Vec<PermissionRule>>,
}

impl ProviderCatalog {
    fn table(&self, kind: ResourceKind) -> &HashMap<String, Vec<PermissionRule>> {
        match kind {
            ResourceKind::Resource => &self.resources,
            ResourceKind::DataSource => &self.data,
        }
    }

    fn table_mut(&mut self, kind: ResourceKind) -> &mut HashMap<String, Vec<PermissionRule>> {
        match kind {
            ResourceKind::Resource => &mut self.resources,
            ResourceKind::DataSource => &mut self.data,
        }
    }
}

/// The immutable rule catalog. Build one with [`CatalogBuilder`] or use the
/// process-wide [`Catalog::builtin`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    providers: HashMap<Provider, ProviderCatalog>,
}

impl Catalog {
    /// The embedded catalog, parsed on first use and shared for the life of
    /// the process.
    pub fn builtin() -> Result<&'static Catalog, PolicyError> {
        BUILTIN.get_or_try_init(|| Ok(CatalogBuilder::with_builtin()?.build()))
    }

    /// Parse a single catalog source.
    pub fn from_yaml_str(origin: &str, source: &str) -> Result<Self, PolicyError> {
        let mut builder = CatalogBuilder::new();
        builder.add_yaml(origin, source)?;
        Ok(builder.build())
    }

    /// Sorted type names registered for `provider` and `kind`.
    pub fn types(&self, provider: Provider, kind: ResourceKind) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .providers
            .get(&provider)
            .map(|p| p.table(kind).keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    pub fn supports(&self, provider: Provider, type_name: &str, kind: ResourceKind) -> bool {
        self.rules(provider, type_name, kind).is_some()
    }

    /// Total number of rules across every provider and kind.
    pub fn rule_count(&self) -> usize {
        self.providers
            .values()
            .flat_map(|p| p.resources.values().chain(p.data.values()))
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }
}

impl RuleSource for Catalog {
    fn rules(
        &self,
        provider: Provider,
        type_name: &str,
        kind: ResourceKind,
    ) -> Option<&[PermissionRule]> {
        self.providers
            .get(&provider)?
            .table(kind)
            .get(type_name)
            .map(Vec::as_slice)
    }
}

/// Accumulates validated rules; [`CatalogBuilder::build`] freezes them.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    providers: HashMap<Provider, ProviderCatalog>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder preloaded with the embedded provider sources.
    pub fn with_builtin() -> Result<Self, PolicyError> {
        let mut builder = Self::new();
        for (origin, source) in BUILTIN_SOURCES {
            builder.add_yaml(origin, source)?;
        }
        Ok(builder)
    }

    /// Parse a YAML source and add its rules. Rules for a type that is already
    /// registered are appended, never replaced.
    pub fn add_yaml(&mut self, origin: &str, source: &str) -> Result<&mut Self, PolicyError> {
        let file: CatalogFile = serde_yaml::from_str(source)
            .map_err(|e| PolicyError::Catalog(format!("{origin}: {e}")))?;

        let provider = file.provider;
        let mut added = 0usize;
        for (kind, entries) in [
            (ResourceKind::Resource, file.resource),
            (ResourceKind::DataSource, file.data),
        ] {
            for (type_name, specs) in entries {
                if specs.is_empty() {
                    return Err(PolicyError::Catalog(format!(
                        "{origin}: {kind} {type_name} has no rules"
                    )));
                }
                for spec in specs {
                    self.add_rule(PermissionRule {
                        provider,
                        type_name: type_name.clone(),
                        kind,
                        conditions: spec.when,
                        actions: spec.actions.into_iter().collect(),
                    })
                    .map_err(|e| match e {
                        PolicyError::Catalog(reason) => {
                            PolicyError::Catalog(format!("{origin}: {reason}"))
                        }
                        other => other,
                    })?;
                    added += 1;
                }
            }
        }

        debug!(origin, %provider, rules = added, "Loaded catalog source");
        Ok(self)
    }

    pub fn add_rule(&mut self, rule: PermissionRule) -> Result<&mut Self, PolicyError> {
        validate_rule(&rule)?;
        self.providers
            .entry(rule.provider)
            .or_default()
            .table_mut(rule.kind)
            .entry(rule.type_name.clone())
            .or_default()
            .push(rule);
        Ok(self)
    }

    pub fn build(self) -> Catalog {
        Catalog { providers: self.providers }
    }
}

fn validate_rule(rule: &PermissionRule) -> Result<(), PolicyError> {
    let prefix = rule.provider.prefix();
    if !rule.type_name.starts_with(&format!("{prefix}_")) {
        return Err(PolicyError::Catalog(format!(
            "{} does not belong to provider {} (expected prefix '{prefix}_')",
            rule.type_name, rule.provider
        )));
    }

    let pattern: &Regex = match rule.provider {
        Provider::Aws => &*AWS_ACTION,
        Provider::Gcp => &*GCP_ACTION,
        Provider::Azure => &*AZURE_ACTION,
    };
    if let Some(bad) = rule.actions.iter().find(|a| !pattern.is_match(a)) {
        return Err(PolicyError::Catalog(format!(
            "{}: '{bad}' is not a valid {} action",
            rule.type_name, rule.provider
        )));
    }

    if rule.conditions.iter().any(|c| c.path().trim().is_empty()) {
        return Err(PolicyError::Catalog(format!(
            "{}: condition with an empty attribute path",
            rule.type_name
        )));
    }
    Ok(())
}
