//! `policyforge-scanner`: finds Terraform sources and turns their `resource`
//! and `data` blocks into [`policyforge_core::ResourceRecord`]s.

pub mod discover;
pub mod error;
pub mod parse;
pub mod scan;

pub use discover::{discover, ScanOptions, DEFAULT_EXCLUDES, MODULE_CACHE_DIR};
pub use error::ScanError;
pub use parse::{parse_source, records_from_tree, SourceFormat};
pub use scan::{load_records, scan_path, FileFailure, ScanOutput};
