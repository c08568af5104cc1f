//! `policyforge-engine`: resolves declared resources to provider actions and
//! turns them into canonical, diffable policies.
//!
//! Control flow: [`Dispatcher`] → [`evaluate`] per resource → [`Aggregator`]
//! across resources → [`canonicalize`] per provider → [`render`] or
//! [`compare`] against a live document.

pub mod aggregator;
pub mod canonical;
pub mod differ;
pub mod dispatcher;
pub mod evaluator;
pub mod pipeline;
pub mod render;

pub use aggregator::Aggregator;
pub use canonical::{canonicalize, merge, CanonicalizeOptions, DEFAULT_SCOPE};
pub use differ::{
    compare, compare_labeled, compare_live, compare_normalized, compare_values, normalize_document,
    parse_live_policy,
};
pub use dispatcher::{Dispatcher, Route};
pub use evaluator::{applicable, evaluate};
pub use pipeline::{ScanReport, Synthesis, Synthesizer, Unresolved};
pub use render::{render, to_document, RenderFormat, AWS_POLICY_VERSION, DEFAULT_POLICY_NAME};
