use serde_json::Value;

use crate::error::PolicyError;
use crate::rule::PermissionRule;
use crate::types::{Provider, ResourceKind};

/// Anything that can be checked against a resource's attribute tree.
///
/// Implemented once for [`crate::Condition`] and [`PermissionRule`]; the
/// catalog supplies data, never per-type code.
pub trait Evaluable {
    /// Whether `self` holds for `attributes`. Unset paths are plain
    /// non-matches; only shape mismatches are errors.
    fn holds(&self, attributes: &Value) -> Result<bool, PolicyError>;
}

/// Read-only lookup from `(provider, type, kind)` to the rules for it.
pub trait RuleSource: Send + Sync {
    /// All rules registered for the key, or `None` when the type is unknown.
    fn rules(&self, provider: Provider, type_name: &str, kind: ResourceKind)
        -> Option<&[PermissionRule]>;
}
