//! `policyforge-core`: shared record, rule and policy types, the error enum,
//! and the traits that connect the catalog to the engine.

pub mod error;
pub mod policy;
pub mod rule;
pub mod traits;
pub mod types;

pub use error::PolicyError;
pub use policy::{CanonicalPolicy, DiffResult, Effect, LivePolicy, Statement};
pub use rule::{ActionSet, Condition, PermissionRule};
pub use traits::{Evaluable, RuleSource};
pub use types::{lookup, provider_prefix, Provider, ResourceKind, ResourceRecord, UTILITY_PREFIXES};
