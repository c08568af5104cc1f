//! Shared plumbing for the subcommands: catalog assembly, record collection
//! and synthesis.

use std::borrow::Cow;
use std::path::Path;

use anyhow::{bail, Context, Result};
use policyforge_catalog::{Catalog, CatalogBuilder};
use policyforge_config::PolicyforgeConfig;
use policyforge_core::ResourceRecord;
use policyforge_engine::{CanonicalizeOptions, Synthesis, Synthesizer};
use policyforge_logging::{EventLogger, ScanEvent};
use policyforge_scanner::{load_records, scan_path, ScanOptions};
use tracing::{info, warn};

use crate::terminal_output::note_warn;

/// The built-in catalog, extended with `catalog.extraPaths` when configured.
pub async fn load_catalog(config: &PolicyforgeConfig) -> Result<Cow<'static, Catalog>> {
    let extra = config.catalog_paths();
    if extra.is_empty() {
        return Ok(Cow::Borrowed(Catalog::builtin()?));
    }

    let mut builder = CatalogBuilder::with_builtin()?;
    for path in extra {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        builder.add_yaml(&path.display().to_string(), &text)?;
    }
    let catalog = builder.build();
    info!(files = extra.len(), rules = catalog.rule_count(), "Extended built-in catalog");
    Ok(Cow::Owned(catalog))
}

/// Where the records of a run come from.
pub enum RecordSource<'a> {
    Sources(&'a Path),
    RecordsFile(&'a Path),
}

impl<'a> RecordSource<'a> {
    pub fn from_args(path: Option<&'a Path>, records: Option<&'a Path>) -> Result<Self> {
        match (records, path) {
            (Some(file), _) => Ok(Self::RecordsFile(file)),
            (None, Some(path)) => Ok(Self::Sources(path)),
            (None, None) => bail!("Nothing to scan: pass a path or --records <file>"),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Sources(path) | Self::RecordsFile(path) => path.display().to_string(),
        }
    }
}

pub async fn collect_records(source: &RecordSource<'_>, options: &ScanOptions) -> Result<Vec<ResourceRecord>> {
    match source {
        RecordSource::RecordsFile(file) => load_records(file).await,
        RecordSource::Sources(path) => {
            let output = scan_path(path, options).await?;
            for failure in &output.failures {
                note_warn(&format!("Skipped {}: {}", failure.path.display(), failure.reason));
            }
            if output.files.is_empty() && output.failures.is_empty() {
                warn!(path = %path.display(), "No Terraform sources found");
            }
            Ok(output.records)
        }
    }
}

/// Run the records through the engine and emit one event per resource.
pub fn synthesize(catalog: &Catalog, records: &[ResourceRecord], label: &str) -> Synthesis {
    let synthesis = Synthesizer::new(catalog).synthesize(records);
    let report = &synthesis.report;
    for address in &report.resolved {
        EventLogger::log_event(label, ScanEvent::Resolved { address: address.clone() });
    }
    for address in &report.skipped {
        EventLogger::log_event(label, ScanEvent::Skipped { address: address.clone() });
    }
    for unresolved in &report.unresolved {
        EventLogger::log_event(
            label,
            ScanEvent::Unresolved {
                address: unresolved.address.clone(),
                type_name: unresolved.type_name.clone(),
                reason: unresolved.reason.clone(),
            },
        );
    }
    synthesis
}

/// Config scan options with command line overrides layered on top.
pub fn scan_options(config: &PolicyforgeConfig, recursive: bool, excludes: &[String]) -> ScanOptions {
    let mut options = config.scan_options();
    options.recursive |= recursive;
    options.excludes.extend(excludes.iter().cloned());
    options
}

/// Config output options with command line overrides layered on top. Any
/// `--resource` flag replaces the configured scope.
pub fn canonicalize_options(
    config: &PolicyforgeConfig,
    group_by_service: bool,
    resources: &[String],
) -> CanonicalizeOptions {
    let mut options = config.canonicalize_options();
    options.group_by_service |= group_by_service;
    if !resources.is_empty() {
        options.resources = resources.to_vec();
    }
    options
}

pub async fn read_document(path: &Path, what: &str) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {what} document: {}", path.display()))
}
