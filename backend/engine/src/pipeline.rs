//! Scan pipeline: dispatch → evaluate → aggregate over a batch of records,
//! keeping per-resource failures isolated in a [`ScanReport`].

use std::panic;
use std::thread;

use policyforge_core::{
    ActionSet, CanonicalPolicy, PolicyError, Provider, ResourceKind, ResourceRecord, RuleSource,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregator::Aggregator;
use crate::canonical::{canonicalize, CanonicalizeOptions};
use crate::dispatcher::{Dispatcher, Route};
use crate::evaluator::evaluate;

/// A record the engine could not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    pub address: String,
    pub type_name: String,
    pub kind: ResourceKind,
    pub reason: String,
}

/// What happened to each record of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Addresses whose permissions were resolved.
    pub resolved: Vec<String>,
    /// Addresses from utility providers that need no permissions.
    pub skipped: Vec<String>,
    pub unresolved: Vec<Unresolved>,
}

impl ScanReport {
    pub fn total(&self) -> usize {
        self.resolved.len() + self.skipped.len() + self.unresolved.len()
    }

    /// Distinct unresolved type names, sorted.
    pub fn unresolved_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.unresolved.iter().map(|u| u.type_name.as_str()).collect();
        types.sort_unstable();
        types.dedup();
        types
    }

    fn merge(&mut self, other: ScanReport) {
        self.resolved.extend(other.resolved);
        self.skipped.extend(other.skipped);
        self.unresolved.extend(other.unresolved);
    }

    fn sort(&mut self) {
        self.resolved.sort();
        self.skipped.sort();
        self.unresolved.sort_by(|a, b| a.address.cmp(&b.address));
    }
}

/// Result of synthesizing a batch of records.
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    pub aggregate: Aggregator,
    pub report: ScanReport,
}

impl Synthesis {
    /// The canonical policy of `provider`; empty when nothing required it.
    pub fn policy(&self, provider: Provider, options: &CanonicalizeOptions) -> CanonicalPolicy {
        canonicalize(provider, &self.aggregate.action_set(provider), options)
    }

    /// One canonical policy per provider that needs at least one action.
    pub fn policies(&self, options: &CanonicalizeOptions) -> Vec<CanonicalPolicy> {
        self.aggregate
            .providers()
            .into_iter()
            .map(|provider| self.policy(provider, options))
            .filter(|policy| !policy.is_empty())
            .collect()
    }
}

/// Runs records through the dispatcher and evaluator into an aggregate.
pub struct Synthesizer<'a, S: RuleSource + ?Sized> {
    dispatcher: Dispatcher<'a, S>,
}

impl<'a, S: RuleSource + ?Sized> Synthesizer<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            dispatcher: Dispatcher::new(source),
        }
    }

    /// Resolve one record. `Ok(None)` means it was skipped on purpose.
    pub fn resolve_one(
        &self,
        record: &ResourceRecord,
    ) -> Result<Option<(Provider, ActionSet)>, PolicyError> {
        match self.dispatcher.resolve(record)? {
            Route::Skip { .. } => Ok(None),
            Route::Rules { provider, rules } => Ok(Some((provider, evaluate(record, rules)))),
        }
    }

    /// Resolve every record. Per-resource failures land in the report and
    /// never stop the batch.
    pub fn synthesize<'r, I>(&self, records: I) -> Synthesis
    where
        I: IntoIterator<Item = &'r ResourceRecord>,
    {
        let mut synthesis = Synthesis::default();
        for record in records {
            self.fold(record, &mut synthesis);
        }
        synthesis.report.sort();

        info!(
            resolved = synthesis.report.resolved.len(),
            skipped = synthesis.report.skipped.len(),
            unresolved = synthesis.report.unresolved.len(),
            "Synthesis complete"
        );
        synthesis
    }

    /// Same result as [`Synthesizer::synthesize`], with the records split into
    /// `partitions` chunks aggregated on scoped threads and merged.
    pub fn synthesize_partitioned(&self, records: &[ResourceRecord], partitions: usize) -> Synthesis {
        let partitions = partitions.max(1);
        if partitions == 1 || records.len() < 2 {
            return self.synthesize(records);
        }

        let chunk = records.len().div_ceil(partitions);
        let parts: Vec<Synthesis> = thread::scope(|scope| {
            let handles: Vec<_> = records
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || {
                        let mut synthesis = Synthesis::default();
                        for record in part {
                            self.fold(record, &mut synthesis);
                        }
                        synthesis
                    })
                })
                .collect();
            // A panicking partition must not silently drop its records.
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect()
        });

        let mut merged = Synthesis::default();
        for part in parts {
            merged.aggregate.merge(part.aggregate);
            merged.report.merge(part.report);
        }
        merged.report.sort();
        debug!(partitions, records = records.len(), "Merged partitioned synthesis");
        merged
    }

    fn fold(&self, record: &ResourceRecord, synthesis: &mut Synthesis) {
        let address = record.address();
        match self.resolve_one(record) {
            Ok(Some((provider, actions))) => {
                debug!(address = %address, %provider, actions = actions.len(), "Resolved");
                synthesis.aggregate.add_resource(provider, record, &actions);
                synthesis.report.resolved.push(address);
            }
            Ok(None) => synthesis.report.skipped.push(address),
            Err(err) => {
                warn!(address = %address, error = %err, "Unresolved resource");
                synthesis.report.unresolved.push(Unresolved {
                    address,
                    type_name: record.type_name.clone(),
                    kind: record.kind,
                    reason: err.to_string(),
                });
            }
        }
    }
}
