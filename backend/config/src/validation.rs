//! Config validation with user-facing field paths.

use once_cell::sync::Lazy;
use policyforge_engine::RenderFormat;
use regex::Regex;
use thiserror::Error;

use crate::schema::PolicyforgeConfig;

/// Policy names become Terraform resource labels and role ids.
static POLICY_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap());

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &PolicyforgeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_scan(config, &mut report);
    validate_output(config, &mut report);
    validate_catalog(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_scan(config: &PolicyforgeConfig, report: &mut ValidationReport) {
    let Some(scan) = &config.scan else { return };
    for (i, name) in scan.excludes.iter().enumerate() {
        if name.trim().is_empty() {
            report.error(format!("scan.excludes.{i}"), "Exclude name cannot be empty");
        } else if name.contains('/') || name.contains('\\') {
            report.warn(
                format!("scan.excludes.{i}"),
                format!("'{name}' looks like a path; excludes match directory names only"),
            );
        }
    }
}

fn validate_output(config: &PolicyforgeConfig, report: &mut ValidationReport) {
    let Some(output) = &config.output else { return };
    if let Some(format) = &output.format {
        if let Err(message) = format.parse::<RenderFormat>() {
            report.error("output.format", message);
        }
    }
    for (i, resource) in output.resources.iter().enumerate() {
        if resource.trim().is_empty() {
            report.error(format!("output.resources.{i}"), "Resource scope cannot be empty");
        }
    }
    if let Some(name) = &output.policy_name {
        if name.trim().is_empty() {
            report.error("output.policyName", "Policy name cannot be empty");
        } else if !POLICY_NAME.is_match(name) {
            report.error(
                "output.policyName",
                format!("'{name}' must start with a letter or underscore and hold only letters, digits, '_' or '-'"),
            );
        }
    }
}

fn validate_catalog(config: &PolicyforgeConfig, report: &mut ValidationReport) {
    let Some(catalog) = &config.catalog else { return };
    for (i, path) in catalog.extra_paths.iter().enumerate() {
        if !path.is_file() {
            report.error(
                format!("catalog.extraPaths.{i}"),
                format!("Catalog file {} is not readable", path.display()),
            );
        }
    }
}

fn validate_logging(config: &PolicyforgeConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        let known = ["trace", "debug", "info", "warn", "error", "off"];
        if !known.contains(&level.to_ascii_lowercase().as_str()) {
            report.warn(
                "logging.level",
                format!("Unknown level '{level}'; it will be read as an env-filter directive"),
            );
        }
    }
}
