//! Routes a resource record to the rules registered for it.

use policyforge_core::{
    PermissionRule, PolicyError, Provider, ResourceRecord, RuleSource, UTILITY_PREFIXES,
};
use tracing::trace;

/// Where a record was routed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Route<'a> {
    /// Rules registered for the record's `(provider, type, kind)`.
    Rules {
        provider: Provider,
        rules: &'a [PermissionRule],
    },
    /// A utility provider that never needs cloud permissions.
    Skip { prefix: &'a str },
}

/// Tagged lookup from a record to its provider's rules.
#[derive(Debug)]
pub struct Dispatcher<'a, S: RuleSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: RuleSource + ?Sized> Clone for Dispatcher<'a, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S: RuleSource + ?Sized> Copy for Dispatcher<'a, S> {}

impl<'a, S: RuleSource + ?Sized> Dispatcher<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Resolve `record` to its rules.
    ///
    /// Fails with `InvalidRecord` for an empty provider or type,
    /// `UnsupportedProvider` for an unknown prefix and `NotImplemented` when
    /// the provider has no rules for the type. All three are scoped to the
    /// one record.
    pub fn resolve<'r>(&self, record: &'r ResourceRecord) -> Result<Route<'r>, PolicyError>
    where
        'a: 'r,
    {
        if record.type_name.trim().is_empty() {
            return Err(PolicyError::InvalidRecord(format!(
                "'{}' has no resource type",
                record.logical_name
            )));
        }
        if record.provider.trim().is_empty() {
            return Err(PolicyError::InvalidRecord(format!(
                "{} has no provider",
                record.address()
            )));
        }

        let prefix = record.provider.as_str();
        if UTILITY_PREFIXES.contains(&prefix) {
            trace!(address = %record.address(), prefix, "Utility provider, no permissions needed");
            return Ok(Route::Skip { prefix });
        }

        let provider = Provider::from_prefix(prefix)
            .ok_or_else(|| PolicyError::UnsupportedProvider(prefix.to_string()))?;

        let source: &'a S = self.source;
        source
            .rules(provider, &record.type_name, record.kind)
            .map(|rules| Route::Rules { provider, rules })
            .ok_or_else(|| PolicyError::NotImplemented {
                type_name: record.type_name.clone(),
                kind: record.kind,
            })
    }
}
