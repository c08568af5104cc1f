//! Canonicalizer: turns an action set into a deterministic policy.

use std::collections::BTreeMap;

use policyforge_core::{ActionSet, CanonicalPolicy, Effect, PolicyError, Provider, Statement};
use serde::{Deserialize, Serialize};

/// Resource scope used when the caller does not narrow it.
pub const DEFAULT_SCOPE: &str = "*";

/// Caller choices that shape a canonical policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalizeOptions {
    /// Explicit resource scopes; empty means [`DEFAULT_SCOPE`].
    #[serde(default)]
    pub resources: Vec<String>,
    /// One statement per service namespace instead of a single statement.
    #[serde(default)]
    pub group_by_service: bool,
}

impl CanonicalizeOptions {
    fn scope(&self) -> Vec<String> {
        let mut scope: Vec<String> = Vec::new();
        for resource in self.resources.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
            if !scope.iter().any(|s| s == resource) {
                scope.push(resource.to_string());
            }
        }
        if scope.is_empty() {
            scope.push(DEFAULT_SCOPE.to_string());
        }
        scope
    }
}

/// Sorted, unique actions wrapped in `Allow` statements.
///
/// An empty set yields a policy with no statements.
pub fn canonicalize(
    provider: Provider,
    actions: &ActionSet,
    options: &CanonicalizeOptions,
) -> CanonicalPolicy {
    if actions.is_empty() {
        return CanonicalPolicy::empty(provider);
    }

    let groups: Vec<Vec<String>> = if options.group_by_service {
        let mut by_service: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for action in actions {
            by_service
                .entry(provider.service_of(action))
                .or_default()
                .push(action.clone());
        }
        by_service.into_values().collect()
    } else {
        vec![actions.iter().cloned().collect()]
    };

    let scope = options.scope();
    let statements = groups
        .into_iter()
        .enumerate()
        .map(|(index, actions)| Statement {
            sid: (provider == Provider::Aws).then(|| format!("VisualEditor{index}")),
            effect: Effect::Allow,
            actions,
            resources: scope.clone(),
        })
        .collect();

    CanonicalPolicy { provider, statements }
}

/// Union of two canonical policies of the same provider, re-canonicalized
/// under `options`.
pub fn merge(
    a: &CanonicalPolicy,
    b: &CanonicalPolicy,
    options: &CanonicalizeOptions,
) -> Result<CanonicalPolicy, PolicyError> {
    if a.provider != b.provider {
        return Err(PolicyError::ProviderMismatch {
            left: a.provider,
            right: b.provider,
        });
    }
    let mut actions = a.actions();
    actions.extend(b.actions());
    Ok(canonicalize(a.provider, &actions, options))
}
