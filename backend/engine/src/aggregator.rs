//! Per-provider accumulation of required actions across a scan.

use std::collections::{BTreeMap, BTreeSet};

use policyforge_core::{ActionSet, Provider, ResourceRecord};

/// Running per-provider action sets plus the resources that asked for each
/// action.
///
/// Resources are folded in independently of each other, so the result does
/// not depend on submission order. Partitions built on separate threads are
/// combined with [`Aggregator::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregator {
    actions: BTreeMap<Provider, ActionSet>,
    provenance: BTreeMap<Provider, BTreeMap<String, BTreeSet<String>>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `actions` to `provider`'s running set.
    pub fn add<I>(&mut self, provider: Provider, actions: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.actions.entry(provider).or_default().extend(actions);
    }

    /// Add the actions resolved for one resource, remembering its address.
    pub fn add_resource(&mut self, provider: Provider, record: &ResourceRecord, actions: &ActionSet) {
        let address = record.address();
        let provenance = self.provenance.entry(provider).or_default();
        for action in actions {
            provenance
                .entry(action.clone())
                .or_default()
                .insert(address.clone());
        }
        self.add(provider, actions.iter().cloned());
    }

    /// Fold a partition aggregated elsewhere into this one.
    pub fn merge(&mut self, other: Aggregator) {
        for (provider, actions) in other.actions {
            self.add(provider, actions);
        }
        for (provider, by_action) in other.provenance {
            let provenance = self.provenance.entry(provider).or_default();
            for (action, addresses) in by_action {
                provenance.entry(action).or_default().extend(addresses);
            }
        }
    }

    /// The accumulated actions of `provider`; empty when nothing required it.
    pub fn action_set(&self, provider: Provider) -> ActionSet {
        self.actions.get(&provider).cloned().unwrap_or_default()
    }

    /// Providers that at least one resolved resource belonged to.
    pub fn providers(&self) -> Vec<Provider> {
        self.actions.keys().copied().collect()
    }

    /// Addresses of the resources that required `action`, sorted.
    pub fn required_by(&self, provider: Provider, action: &str) -> Vec<&str> {
        self.provenance
            .get(&provider)
            .and_then(|by_action| by_action.get(action))
            .map(|addresses| addresses.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.values().all(ActionSet::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policyforge_core::ResourceKind;
    use serde_json::json;

    fn set(actions: &[&str]) -> ActionSet {
        actions.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn empty_scan_yields_empty_sets() {
        let agg = Aggregator::new();
        assert!(agg.is_empty());
        for provider in Provider::ALL {
            assert!(agg.action_set(provider).is_empty());
        }
        assert!(agg.providers().is_empty());
    }

    #[test]
    fn actions_are_deduplicated_per_provider() {
        let mut agg = Aggregator::new();
        agg.add(Provider::Aws, set(&["s3:GetObject", "s3:PutObject"]));
        agg.add(Provider::Aws, set(&["s3:GetObject"]));
        agg.add(Provider::Gcp, set(&["storage.objects.get"]));
        assert_eq!(agg.action_set(Provider::Aws), set(&["s3:GetObject", "s3:PutObject"]));
        assert_eq!(agg.providers(), vec![Provider::Aws, Provider::Gcp]);
    }

    #[test]
    fn provenance_tracks_every_requiring_resource() {
        let logs = ResourceRecord::new("aws_s3_bucket", "logs", ResourceKind::Resource, json!({}));
        let site = ResourceRecord::new("aws_s3_bucket", "site", ResourceKind::Resource, json!({}));
        let mut agg = Aggregator::new();
        agg.add_resource(Provider::Aws, &site, &set(&["s3:CreateBucket"]));
        agg.add_resource(Provider::Aws, &logs, &set(&["s3:CreateBucket", "s3:PutBucketTagging"]));
        assert_eq!(
            agg.required_by(Provider::Aws, "s3:CreateBucket"),
            vec!["aws_s3_bucket.logs", "aws_s3_bucket.site"]
        );
        assert!(agg.required_by(Provider::Aws, "s3:DeleteBucket").is_empty());
    }

    #[test]
    fn merge_matches_sequential_aggregation() {
        let a = ResourceRecord::new("aws_sqs_queue", "a", ResourceKind::Resource, json!({}));
        let b = ResourceRecord::new("aws_sns_topic", "b", ResourceKind::Resource, json!({}));

        let mut whole = Aggregator::new();
        whole.add_resource(Provider::Aws, &a, &set(&["sqs:CreateQueue"]));
        whole.add_resource(Provider::Aws, &b, &set(&["sns:CreateTopic"]));

        let mut left = Aggregator::new();
        left.add_resource(Provider::Aws, &a, &set(&["sqs:CreateQueue"]));
        let mut right = Aggregator::new();
        right.add_resource(Provider::Aws, &b, &set(&["sns:CreateTopic"]));
        left.merge(right);

        assert_eq!(left, whole);
    }
}
