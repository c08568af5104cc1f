//! Locate Terraform source files under a root directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::error::ScanError;
use crate::parse::SourceFormat;

/// Directory holding modules downloaded by `terraform init`.
pub const MODULE_CACHE_DIR: &str = ".terraform";

/// Directory names never scanned: VCS metadata, tool working dirs and the
/// provider plugin cache.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".external_modules",
    ".policyforge",
    "registry.terraform.io",
];

/// How a source tree is walked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Extra directory names to skip, on top of [`DEFAULT_EXCLUDES`].
    pub excludes: Vec<String>,
    /// Descend into `.terraform` even when not recursive, so downloaded
    /// modules count as part of the codebase.
    pub follow_module_cache: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            excludes: Vec::new(),
            follow_module_cache: true,
        }
    }
}

impl ScanOptions {
    pub fn is_excluded(&self, name: &str) -> bool {
        DEFAULT_EXCLUDES.contains(&name) || self.excludes.iter().any(|e| e == name)
    }
}

fn inside_module_cache(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .map(|rel| rel.components().any(|c| c.as_os_str() == MODULE_CACHE_DIR))
        .unwrap_or(false)
}

fn keep(entry: &DirEntry, root: &Path, options: &ScanOptions) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    if options.is_excluded(&name) {
        trace!(dir = %entry.path().display(), "Excluded directory");
        return false;
    }
    if options.recursive {
        return true;
    }
    options.follow_module_cache && inside_module_cache(root, entry.path())
}

/// Every `*.tf` and `*.tf.json` file under `root`, sorted by path.
pub fn discover(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| keep(entry, root, options));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && SourceFormat::of(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    files.sort();

    debug!(root = %root.display(), files = files.len(), recursive = options.recursive, "Discovered sources");
    Ok(files)
}
