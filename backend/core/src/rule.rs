//! Declarative permission rules and the predicate language they use.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolicyError;
use crate::traits::Evaluable;
use crate::types::{lookup, Provider, ResourceKind};

/// A deduplicated, lexicographically ordered set of provider actions.
pub type ActionSet = BTreeSet<String>;

/// A predicate over one attribute path of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// The attribute is set to a non-null value.
    Present { path: String },
    /// The attribute is unset or null.
    Absent { path: String },
    /// The attribute literally equals `value`.
    Equals { path: String, value: Value },
    /// The attribute literally equals one of `values`.
    OneOf { path: String, values: Vec<Value> },
}

impl Condition {
    pub fn path(&self) -> &str {
        match self {
            Self::Present { path }
            | Self::Absent { path }
            | Self::Equals { path, .. }
            | Self::OneOf { path, .. } => path,
        }
    }
}

impl Evaluable for Condition {
    fn holds(&self, attributes: &Value) -> Result<bool, PolicyError> {
        let found = lookup(attributes, self.path());
        match self {
            Self::Present { .. } => Ok(found.is_some()),
            Self::Absent { .. } => Ok(found.is_none()),
            Self::Equals { path, value } => match found {
                None => Ok(false),
                Some(actual) => {
                    check_comparable(path, actual, value)?;
                    Ok(actual == value)
                }
            },
            Self::OneOf { path, values } => match found {
                None => Ok(false),
                Some(actual) => {
                    for candidate in values {
                        check_comparable(path, actual, candidate)?;
                    }
                    Ok(values.contains(actual))
                }
            },
        }
    }
}

/// A scalar expectation cannot be met by a structured attribute; that is a
/// shape mismatch rather than a plain non-match.
fn check_comparable(path: &str, actual: &Value, expected: &Value) -> Result<(), PolicyError> {
    let structured = |v: &Value| v.is_object() || v.is_array();
    if structured(actual) && !structured(expected) {
        return Err(PolicyError::MalformedAttributes {
            path: path.to_string(),
            reason: format!("expected a scalar comparable with {expected}, found {actual}"),
        });
    }
    Ok(())
}

/// One rule of the catalog: the actions a declaration needs when all
/// `conditions` hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub provider: Provider,
    pub type_name: String,
    pub kind: ResourceKind,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub actions: ActionSet,
}

impl PermissionRule {
    pub fn unconditional(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl Evaluable for PermissionRule {
    fn holds(&self, attributes: &Value) -> Result<bool, PolicyError> {
        for condition in &self.conditions {
            if !condition.holds(attributes)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
