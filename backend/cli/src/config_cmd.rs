//! `policyforge config`: create, show and validate the config file.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use policyforge_config::{apply_all_defaults, load_config, validate, write_config, PolicyforgeConfig};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a config file holding every default value
    Init {
        /// Overwrite an existing file (the old one is kept as a backup)
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config, defaults included
    Show,
    /// Check the config file and report problems
    Validate,
}

pub async fn run(cmd: ConfigCommands, path: &Path, config: &PolicyforgeConfig) -> Result<ExitCode> {
    match cmd {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite it", path.display());
            }
            write_config(&apply_all_defaults(PolicyforgeConfig::default()), path).await?;
            note_success(&format!("Wrote {}", path.display()));
        }
        ConfigCommands::Show => {
            note_info(&format!("Config file: {}", path.display()));
            let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
            print!("{yaml}");
        }
        ConfigCommands::Validate => {
            // Validate what is on disk, not the defaulted copy.
            let raw = load_config(path).await?;
            if !validate_and_report(&raw) {
                return Ok(ExitCode::from(1));
            }
            note_success(&format!("{} is valid", path.display()));
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print every finding; false when there is at least one error.
fn validate_and_report(config: &PolicyforgeConfig) -> bool {
    let report = validate(config);
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
    report.is_valid()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_refuses_to_clobber_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = PolicyforgeConfig::default();

        run(ConfigCommands::Init { force: false }, &path, &config).await.unwrap();
        let written = load_config(&path).await.unwrap();
        assert_eq!(written, apply_all_defaults(PolicyforgeConfig::default()));

        assert!(run(ConfigCommands::Init { force: false }, &path, &config).await.is_err());
        run(ConfigCommands::Init { force: true }, &path, &config).await.unwrap();
        assert!(path.with_extension("yaml.bak.1").exists());
    }

    #[tokio::test]
    async fn validate_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "output:\n  format: yaml\n").unwrap();
        let code = run(ConfigCommands::Validate, &path, &PolicyforgeConfig::default())
            .await
            .unwrap();
        assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::from(1)));
    }
}
