//! `policyforge-config`: runtime configuration management.
//!
//! Provides:
//! - Typed config schema (scan, output, catalog, logging)
//! - YAML read/write with atomic backup rotation
//! - Default value application
//! - Validation with field paths

pub mod defaults;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::{apply_all_defaults, DEFAULT_LOG_LEVEL};
pub use io::{
    config_dir, config_file_path, load_config, resolve_config_path, write_config, CONFIG_DIR_ENV,
};
pub use schema::{CatalogConfig, LoggingConfig, OutputConfig, PolicyforgeConfig, ScanConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::Result;
use std::path::Path;

/// Load a config file, apply defaults and log validation findings.
///
/// This is the main entry point for loading a config at runtime. Validation
/// problems are logged, not returned; callers that must refuse an invalid
/// config run [`validate`] themselves.
pub async fn load_and_prepare(path: &Path) -> Result<PolicyforgeConfig> {
    Ok(prepare(load_config(path).await?))
}

/// Apply defaults to an already loaded config and log validation findings.
pub fn prepare(config: PolicyforgeConfig) -> PolicyforgeConfig {
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    config
}
