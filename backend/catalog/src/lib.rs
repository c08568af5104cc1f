//! `policyforge-catalog`: the read-only rule catalog.
//!
//! Provides:
//! - Embedded AWS, GCP and Azure rule data (`data/*.yaml`)
//! - A process-wide built-in catalog initialized once
//! - A builder for extending the catalog with extra rule files

pub mod catalog;

pub use catalog::{Catalog, CatalogBuilder};
