//! `policyforge compare`: the AWS policy a codebase needs vs. a deployed one.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use policyforge_config::PolicyforgeConfig;
use policyforge_core::{DiffResult, Provider};
use policyforge_engine::{compare_live, parse_live_policy, render, RenderFormat};
use tracing::info;

use crate::context::{self, RecordSource};
use crate::terminal_output::{colorize_diff, note_success, note_warn, supports_color};

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Terraform file or directory to scan
    #[arg(required_unless_present = "records")]
    pub path: Option<PathBuf>,

    /// Deployed policy document, or an AWS `get-policy-version` response
    #[arg(long, value_name = "FILE")]
    pub live: PathBuf,

    /// Read pre-parsed resource records (JSON) instead of Terraform sources
    #[arg(long, value_name = "FILE")]
    pub records: Option<PathBuf>,

    /// Sort and dedup the action lists of the live document before comparing
    #[arg(long)]
    pub normalize_live: bool,

    /// Exit with status 1 when the policies differ
    #[arg(long)]
    pub fail_on_drift: bool,

    /// Directory name to skip (repeatable)
    #[arg(short, long = "exclude", value_name = "DIR")]
    pub excludes: Vec<String>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,
}

pub async fn run(args: CompareArgs, config: &PolicyforgeConfig) -> Result<ExitCode> {
    let source = RecordSource::from_args(args.path.as_deref(), args.records.as_deref())?;
    let scan_options = context::scan_options(config, args.recursive, &args.excludes);
    let records = context::collect_records(&source, &scan_options).await?;

    let catalog = context::load_catalog(config).await?;
    let synthesis = context::synthesize(&catalog, &records, &source.label());
    let policy = synthesis.policy(Provider::Aws, &context::canonicalize_options(config, false, &[]));
    if policy.is_empty() {
        note_warn("The scanned resources need no AWS permissions");
    }
    let generated = render(&policy, RenderFormat::Json, config.policy_name())?;

    let result = compare_with_live_file(&args.live, &generated, args.normalize_live).await?;
    report(&result);

    info!(live = %args.live.display(), changed = result.changed, "Compared with live policy");
    if result.changed && args.fail_on_drift {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

async fn compare_with_live_file(live: &Path, generated: &str, normalize: bool) -> Result<DiffResult> {
    let text = context::read_document(live, "live").await?;
    let live = parse_live_policy(&text)?;
    if let Some(version) = &live.version {
        info!(version = %version, "Live policy version");
    }
    Ok(compare_live(&live, generated, normalize)?)
}

/// Print the annotated diff on stdout, or a note when nothing drifted.
pub fn report(result: &DiffResult) {
    if !result.changed {
        note_success("No drift: the live policy matches");
        return;
    }
    if supports_color() {
        print!("{}", colorize_diff(&result.annotated));
    } else {
        print!("{}", result.annotated);
        if !result.annotated.ends_with('\n') {
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[tokio::test]
    async fn live_envelope_with_same_actions_has_no_drift() {
        let dir = tempfile::tempdir().unwrap();
        let generated = r#"{"Version":"2012-10-17","Statement":[{"Sid":"VisualEditor0","Effect":"Allow","Action":["s3:CreateBucket","s3:PutObject"],"Resource":"*"}]}"#;
        let live = write(
            dir.path(),
            "live.json",
            r#"{"PolicyVersion":{"VersionId":"v2","Document":{"Version":"2012-10-17","Statement":[{"Sid":"VisualEditor0","Effect":"Allow","Action":["s3:PutObject","s3:CreateBucket","s3:PutObject"],"Resource":"*"}]}}}"#,
        );

        let raw = compare_with_live_file(&live, generated, false).await.unwrap();
        assert!(raw.changed);
        let normalized = compare_with_live_file(&live, generated, true).await.unwrap();
        assert!(!normalized.changed);
    }

    #[tokio::test]
    async fn drift_sets_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "main.tf",
            "resource \"aws_sqs_queue\" \"jobs\" {\n  name = \"jobs\"\n}\n",
        );
        let live = write(
            dir.path(),
            "live.json",
            r#"{"Version":"2012-10-17","Statement":[{"Sid":"VisualEditor0","Effect":"Allow","Action":["s3:GetObject"],"Resource":"*"}]}"#,
        );

        let args = CompareArgs {
            path: Some(dir.path().to_path_buf()),
            live,
            records: None,
            normalize_live: false,
            fail_on_drift: true,
            excludes: Vec::new(),
            recursive: false,
        };
        let code = run(args, &PolicyforgeConfig::default()).await.unwrap();
        assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::from(1)));
    }
}
