//! `policyforge diff`: structural comparison of two policy files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use policyforge_core::DiffResult;
use policyforge_engine::{compare, compare_normalized};

use crate::compare_cmd::report;
use crate::context::read_document;

#[derive(Debug, Args)]
pub struct DiffArgs {
    pub left: PathBuf,
    pub right: PathBuf,

    /// Sort and dedup action lists on both sides first
    #[arg(long)]
    pub normalize: bool,

    /// Exit with status 1 when the documents differ
    #[arg(long)]
    pub fail_on_change: bool,
}

pub async fn run(args: DiffArgs) -> Result<ExitCode> {
    let left = read_document(&args.left, "left").await?;
    let right = read_document(&args.right, "right").await?;

    let result = diff_documents(&left, &right, args.normalize)?;
    report(&result);

    if result.changed && args.fail_on_change {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn diff_documents(left: &str, right: &str, normalize: bool) -> Result<DiffResult> {
    let result = if normalize {
        compare_normalized(left, right)?
    } else {
        compare(left, right)?
    };
    Ok(result)
}
