//! Rule evaluator: decides which of a record's rules apply and collects
//! their actions.
//!
//! Every rule whose conditions all hold contributes; contributions are
//! additive. A rule whose conditions cannot be checked against the record's
//! attributes (a scalar expectation meeting a block or list) is logged and
//! treated as not matching.

use policyforge_core::{ActionSet, Evaluable, PermissionRule, ResourceRecord};
use tracing::{debug, warn};

/// Union of the actions of every rule that applies to `record`.
pub fn evaluate(record: &ResourceRecord, rules: &[PermissionRule]) -> ActionSet {
    let mut actions = ActionSet::new();
    for rule in applicable(record, rules) {
        actions.extend(rule.actions.iter().cloned());
    }
    actions
}

/// The rules that apply to `record`, in catalog order.
pub fn applicable<'a>(record: &ResourceRecord, rules: &'a [PermissionRule]) -> Vec<&'a PermissionRule> {
    rules
        .iter()
        .filter(|rule| match rule.holds(&record.attributes) {
            Ok(applies) => {
                if applies && !rule.unconditional() {
                    debug!(address = %record.address(), conditions = rule.conditions.len(), "Conditional rule applies");
                }
                applies
            }
            Err(err) => {
                warn!(address = %record.address(), error = %err, "Skipping rule with uncheckable conditions");
                false
            }
        })
        .collect()
}
