//! Config file read/write with atomic backup rotation.

use crate::schema::PolicyforgeConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "POLICYFORGE_CONFIG_DIR";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 5;

/// Resolve the policyforge config directory.
/// Priority: `POLICYFORGE_CONFIG_DIR` env > `~/.policyforge/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    match dirs::home_dir() {
        Some(home) => home.join(".policyforge"),
        None => PathBuf::from(".policyforge"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// The file named on the command line, or the default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => config_file_path(&config_dir()),
    }
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist.
pub async fn load_config(path: &Path) -> Result<PolicyforgeConfig> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(PolicyforgeConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file is a valid, empty config.
    if raw.trim().is_empty() {
        return Ok(PolicyforgeConfig::default());
    }

    let config: PolicyforgeConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Write config to disk atomically (write to temp file, rename).
///
/// Creates a rolling backup of the previous config before overwriting.
pub async fn write_config(config: &PolicyforgeConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    if fs::try_exists(path).await.unwrap_or(false) {
        rotate_backups(path).await;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;

    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

/// Rotate backup files: config.yaml.bak.1 → .bak.2 → ... → .bak.N
async fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let old = path.with_extension(format!("yaml.bak.{i}"));
        let new = path.with_extension(format!("yaml.bak.{}", i + 1));
        if fs::try_exists(&old).await.unwrap_or(false) {
            if let Err(e) = fs::rename(&old, &new).await {
                warn!("Failed to rotate backup {}: {}", old.display(), e);
            }
        }
    }

    let bak = path.with_extension("yaml.bak.1");
    if let Err(e) = fs::copy(path, &bak).await {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LoggingConfig, OutputConfig};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.yaml")).await.unwrap();
        assert_eq!(config, PolicyforgeConfig::default());
    }

    #[tokio::test]
    async fn write_then_load_keeps_values_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = PolicyforgeConfig::default();
        config.output = Some(OutputConfig {
            format: Some("text".into()),
            ..Default::default()
        });
        write_config(&config, &path).await.unwrap();
        assert_eq!(load_config(&path).await.unwrap(), config);

        config.logging = Some(LoggingConfig {
            level: Some("debug".into()),
            ..Default::default()
        });
        write_config(&config, &path).await.unwrap();
        assert_eq!(load_config(&path).await.unwrap(), config);

        assert!(path.with_extension("yaml.bak.1").exists());
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[tokio::test]
    async fn invalid_yaml_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "scan: [unterminated").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config YAML"));
    }

    #[test]
    fn explicit_path_wins() {
        let explicit = Path::new("/tmp/custom.yaml");
        assert_eq!(resolve_config_path(Some(explicit)), explicit);
        assert!(resolve_config_path(None).ends_with(CONFIG_FILE_NAME));
    }
}
