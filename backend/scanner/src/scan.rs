//! Async entry points: scan a file or directory, or load pre-parsed records.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use policyforge_core::ResourceRecord;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::discover::{discover, ScanOptions};
use crate::error::ScanError;
use crate::parse::parse_source;

/// A source file that could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a scan found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutput {
    pub records: Vec<ResourceRecord>,
    /// Source files that were parsed successfully.
    pub files: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

/// Scan a single source file or every source file under a directory.
///
/// Files that fail to parse are logged and listed in
/// [`ScanOutput::failures`]; they never abort the scan. A missing path does.
pub async fn scan_path(path: &Path, options: &ScanOptions) -> Result<ScanOutput> {
    let metadata = fs::metadata(path)
        .await
        .with_context(|| format!("Cannot scan {}", path.display()))?;

    let files = if metadata.is_dir() {
        let root = path.to_path_buf();
        let options = options.clone();
        tokio::task::spawn_blocking(move || discover(&root, &options))
            .await
            .context("Source discovery task failed")??
    } else {
        vec![path.to_path_buf()]
    };

    let mut output = ScanOutput::default();
    for file in files {
        match scan_file(&file).await {
            Ok(records) => {
                debug!(file = %file.display(), records = records.len(), "Scanned file");
                output.records.extend(records);
                output.files.push(file);
            }
            Err(err) => {
                warn!(file = %file.display(), error = %err, "Skipping unparseable file");
                output.failures.push(FileFailure {
                    path: file,
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        path = %path.display(),
        files = output.files.len(),
        records = output.records.len(),
        failures = output.failures.len(),
        "Scan complete"
    );
    Ok(output)
}

async fn scan_file(path: &Path) -> Result<Vec<ResourceRecord>, ScanError> {
    let text = fs::read_to_string(path).await.map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_source(path, &text)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    List(Vec<ResourceRecord>),
    Wrapped { records: Vec<ResourceRecord> },
}

/// Load records produced by an external parser: a JSON array of records or
/// an object with a `records` array. Missing providers are inferred from the
/// type name.
pub async fn load_records(path: &Path) -> Result<Vec<ResourceRecord>> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;
    let file: RecordsFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse records JSON at: {}", path.display()))?;

    let records = match file {
        RecordsFile::List(records) | RecordsFile::Wrapped { records } => records,
    };
    if let Some(bad) = records.iter().find(|r| r.type_name.trim().is_empty()) {
        bail!(
            "{}: record '{}' has an empty type_name",
            path.display(),
            bad.logical_name
        );
    }

    let records: Vec<ResourceRecord> = records
        .into_iter()
        .map(ResourceRecord::with_inferred_provider)
        .collect();
    info!(path = %path.display(), records = records.len(), "Loaded records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use policyforge_core::ResourceKind;
    use serde_json::json;

    #[tokio::test]
    async fn broken_file_does_not_abort_directory_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.tf"),
            "resource \"aws_sqs_queue\" \"jobs\" {\n  name = \"jobs\"\n}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.tf"), "resource \"aws_sns_topic\" {").unwrap();

        let output = scan_path(dir.path(), &ScanOptions::default()).await.unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].address(), "aws_sqs_queue.jobs");
        assert_eq!(output.files.len(), 1);
        assert_eq!(output.failures.len(), 1);
        assert!(output.failures[0].path.ends_with("broken.tf"));
    }

    #[tokio::test]
    async fn single_file_can_be_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("net.tf.json");
        std::fs::write(&file, json!({ "data": { "aws_vpc": { "main": {} } } }).to_string()).unwrap();

        let output = scan_path(&file, &ScanOptions::default()).await.unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].kind, ResourceKind::DataSource);
    }

    #[tokio::test]
    async fn missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_path(&dir.path().join("nope"), &ScanOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Cannot scan"));
    }

    #[tokio::test]
    async fn loads_both_record_file_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.json");
        std::fs::write(
            &list,
            json!([{ "type_name": "google_storage_bucket", "logical_name": "a", "kind": "resource" }])
                .to_string(),
        )
        .unwrap();
        let records = load_records(&list).await.unwrap();
        assert_eq!(records[0].provider, "google");

        let wrapped = dir.path().join("wrapped.json");
        std::fs::write(
            &wrapped,
            json!({ "records": [{
                "provider": "aws",
                "type_name": "aws_s3_bucket",
                "logical_name": "b",
                "kind": "data",
                "attributes": { "bucket": "b" }
            }] })
            .to_string(),
        )
        .unwrap();
        let records = load_records(&wrapped).await.unwrap();
        assert_eq!(records[0].kind, ResourceKind::DataSource);
        assert_eq!(records[0].attribute("bucket"), Some(&json!("b")));
    }

    #[tokio::test]
    async fn rejects_records_without_type() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        std::fs::write(
            &file,
            json!([{ "type_name": "", "logical_name": "x", "kind": "resource" }]).to_string(),
        )
        .unwrap();
        assert!(load_records(&file).await.is_err());
    }
}
