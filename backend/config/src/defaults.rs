//! Config defaults: fills every unset value so the effective config can be
//! shown in full.

use policyforge_engine::{RenderFormat, DEFAULT_POLICY_NAME};

use crate::schema::{LoggingConfig, OutputConfig, PolicyforgeConfig, ScanConfig};

/// Default log level when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: PolicyforgeConfig) -> PolicyforgeConfig {
    let config = apply_scan_defaults(config);
    let config = apply_output_defaults(config);
    apply_logging_defaults(config)
}

fn apply_scan_defaults(mut config: PolicyforgeConfig) -> PolicyforgeConfig {
    let scan = config.scan.get_or_insert_with(ScanConfig::default);
    if scan.recursive.is_none() {
        scan.recursive = Some(false);
    }
    if scan.follow_module_cache.is_none() {
        scan.follow_module_cache = Some(true);
    }
    config
}

fn apply_output_defaults(mut config: PolicyforgeConfig) -> PolicyforgeConfig {
    let output = config.output.get_or_insert_with(OutputConfig::default);
    if output.format.is_none() {
        output.format = Some(RenderFormat::default().to_string());
    }
    if output.group_by_service.is_none() {
        output.group_by_service = Some(false);
    }
    if output.policy_name.is_none() {
        output.policy_name = Some(DEFAULT_POLICY_NAME.to_string());
    }
    config
}

fn apply_logging_defaults(mut config: PolicyforgeConfig) -> PolicyforgeConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.json.is_none() {
        logging.json = Some(false);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_unset_values() {
        let config = apply_all_defaults(PolicyforgeConfig::default());
        let output = config.output.as_ref().unwrap();
        assert_eq!(output.format.as_deref(), Some("json"));
        assert_eq!(output.policy_name.as_deref(), Some(DEFAULT_POLICY_NAME));
        assert_eq!(config.scan.as_ref().unwrap().follow_module_cache, Some(true));
        assert_eq!(config.logging.as_ref().unwrap().level.as_deref(), Some("info"));
        assert!(config.catalog.is_none());
    }

    #[test]
    fn keeps_explicit_values() {
        let mut config = PolicyforgeConfig::default();
        config.output = Some(OutputConfig {
            format: Some("terraform".into()),
            group_by_service: Some(true),
            ..Default::default()
        });
        let config = apply_all_defaults(config);
        let output = config.output.unwrap();
        assert_eq!(output.format.as_deref(), Some("terraform"));
        assert_eq!(output.group_by_service, Some(true));
    }

    #[test]
    fn defaults_are_idempotent() {
        let once = apply_all_defaults(PolicyforgeConfig::default());
        let twice = apply_all_defaults(once.clone());
        assert_eq!(once, twice);
    }
}
