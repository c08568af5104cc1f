//! policyforge configuration schema.
//!
//! Every field is optional so a partial YAML file deserializes cleanly;
//! [`crate::defaults::apply_all_defaults`] fills the gaps afterwards.

use std::path::PathBuf;

use policyforge_engine::{CanonicalizeOptions, RenderFormat, DEFAULT_POLICY_NAME};
use policyforge_scanner::ScanOptions;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyforgeConfig {
    /// How source trees are walked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanConfig>,

    /// Policy output shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    /// Rule catalog extensions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    /// Directory names skipped in addition to the built-in excludes.
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_module_cache: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>, // "json" | "text" | "terraform"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by_service: Option<bool>,
    /// Resource scope written into every statement.
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    /// Extra rule files layered over the built-in catalog.
    #[serde(default)]
    pub extra_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the daily rolling log file; no file output when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

// ---------------------------------------------------------------------------
// Views for the engine and scanner
// ---------------------------------------------------------------------------

impl PolicyforgeConfig {
    pub fn scan_options(&self) -> ScanOptions {
        let defaults = ScanOptions::default();
        match &self.scan {
            Some(scan) => ScanOptions {
                recursive: scan.recursive.unwrap_or(defaults.recursive),
                excludes: scan.excludes.clone(),
                follow_module_cache: scan.follow_module_cache.unwrap_or(defaults.follow_module_cache),
            },
            None => defaults,
        }
    }

    pub fn canonicalize_options(&self) -> CanonicalizeOptions {
        match &self.output {
            Some(output) => CanonicalizeOptions {
                resources: output.resources.clone(),
                group_by_service: output.group_by_service.unwrap_or(false),
            },
            None => CanonicalizeOptions::default(),
        }
    }

    /// The configured output format. Unknown names fall back to JSON;
    /// validation reports them separately.
    pub fn render_format(&self) -> RenderFormat {
        self.output
            .as_ref()
            .and_then(|o| o.format.as_deref())
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    }

    pub fn policy_name(&self) -> &str {
        self.output
            .as_ref()
            .and_then(|o| o.policy_name.as_deref())
            .unwrap_or(DEFAULT_POLICY_NAME)
    }

    pub fn catalog_paths(&self) -> &[PathBuf] {
        self.catalog.as_ref().map(|c| c.extra_paths.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const YAML: &str = r#"
scan:
  recursive: true
  excludes:
    - vendor
output:
  format: terraform
  groupByService: true
  resources:
    - "arn:aws:s3:::logs"
  policyName: deployer
catalog:
  extraPaths:
    - rules/extra.yaml
logging:
  level: debug
  json: true
"#;

    #[test]
    fn parses_camel_case_sections() {
        let config: PolicyforgeConfig = serde_yaml::from_str(YAML).unwrap();
        let scan = config.scan_options();
        assert!(scan.recursive);
        assert!(scan.follow_module_cache);
        assert_eq!(scan.excludes, vec!["vendor"]);

        let options = config.canonicalize_options();
        assert!(options.group_by_service);
        assert_eq!(options.resources, vec!["arn:aws:s3:::logs"]);

        assert_eq!(config.render_format(), RenderFormat::Terraform);
        assert_eq!(config.policy_name(), "deployer");
        assert_eq!(config.catalog_paths(), &[PathBuf::from("rules/extra.yaml")]);
        assert_eq!(config.logging.unwrap().json, Some(true));
    }

    #[test]
    fn empty_config_uses_engine_defaults() {
        let config = PolicyforgeConfig::default();
        assert_eq!(config.scan_options(), ScanOptions::default());
        assert_eq!(config.canonicalize_options(), CanonicalizeOptions::default());
        assert_eq!(config.render_format(), RenderFormat::Json);
        assert_eq!(config.policy_name(), DEFAULT_POLICY_NAME);
        assert!(config.catalog_paths().is_empty());
    }

    #[test]
    fn unset_sections_are_not_serialized() {
        let yaml = serde_yaml::to_string(&PolicyforgeConfig::default()).unwrap();
        assert_eq!(yaml.trim(), "{}");
    }
}
