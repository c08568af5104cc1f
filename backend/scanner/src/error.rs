use std::path::PathBuf;

use thiserror::Error;

/// Failure to read or interpret one source file.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid HCL: {reason}", .path.display())]
    Hcl { path: PathBuf, reason: String },

    #[error("{}: invalid JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: unexpected {block} block layout: {reason}", .path.display())]
    Layout {
        path: PathBuf,
        block: &'static str,
        reason: String,
    },

    #[error("{}: not a Terraform source file", .0.display())]
    UnsupportedFile(PathBuf),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}
