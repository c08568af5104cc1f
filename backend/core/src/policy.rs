use serde::{Deserialize, Serialize};

use crate::rule::ActionSet;
use crate::types::Provider;

/// Statement effect. Synthesized policies only ever allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Effect {
    #[default]
    Allow,
}

/// One statement of a canonical policy. `actions` is sorted and unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

/// The deduplicated, deterministically ordered permissions of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPolicy {
    pub provider: Provider,
    pub statements: Vec<Statement>,
}

impl CanonicalPolicy {
    pub fn empty(provider: Provider) -> Self {
        Self { provider, statements: Vec::new() }
    }

    /// Union of the actions of every statement.
    pub fn actions(&self) -> ActionSet {
        self.statements
            .iter()
            .flat_map(|s| s.actions.iter().cloned())
            .collect()
    }

    /// Union of the resource scopes of every statement, in first-seen order.
    pub fn resources(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for resource in self.statements.iter().flat_map(|s| &s.resources) {
            if !seen.contains(resource) {
                seen.push(resource.clone());
            }
        }
        seen
    }

    pub fn is_empty(&self) -> bool {
        self.statements.iter().all(|s| s.actions.is_empty())
    }
}

/// Outcome of a structural comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub changed: bool,
    /// Annotated rendering; empty when nothing changed.
    pub annotated: String,
}

impl DiffResult {
    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// A deployed policy handed over by an identity-service client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivePolicy {
    /// Serialized policy document.
    pub document: String,
    /// Version marker of the deployed document, when known (e.g. `v3`).
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_union_across_statements() {
        let policy = CanonicalPolicy {
            provider: Provider::Aws,
            statements: vec![
                Statement {
                    sid: None,
                    effect: Effect::Allow,
                    actions: vec!["s3:GetObject".into(), "s3:PutObject".into()],
                    resources: vec!["*".into()],
                },
                Statement {
                    sid: None,
                    effect: Effect::Allow,
                    actions: vec!["ec2:RunInstances".into(), "s3:GetObject".into()],
                    resources: vec!["*".into()],
                },
            ],
        };
        let actions: Vec<_> = policy.actions().into_iter().collect();
        assert_eq!(actions, vec!["ec2:RunInstances", "s3:GetObject", "s3:PutObject"]);
        assert_eq!(policy.resources(), vec!["*".to_string()]);
        assert!(!policy.is_empty());
        assert!(CanonicalPolicy::empty(Provider::Gcp).is_empty());
    }
}
