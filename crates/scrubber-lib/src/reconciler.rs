//! Expiry reconciliation
//!
//! Bridges classifier output and the expiry policy:
//! - which resources still need an initial marker
//! - which clusters are past their marker date
//! - extending one marked cluster
//!
//! Per-resource failures (malformed dates, failed writes) are isolated to that
//! resource and collected in a [`WriteReport`]; only listing failures abort a
//! pass.

use crate::classifier::{Classifier, ClassifierConfig, ClusterBuckets, ClusterInventory};
use crate::error::{Result, ScrubError};
use crate::expiry::{compute_expiry, is_expired, parse_date, shift_date};
use crate::models::{ClusterGroup, ExpiryRecord, Resource};
use crate::observability::StructuredLogger;
use crate::store::TagStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Resource left untouched by a batch, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedResource {
    pub resource_id: String,
    pub reason: String,
}

/// Marker write the adapter rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedWrite {
    pub resource_id: String,
    pub error: String,
}

/// Outcome of a batch of marker writes. Batches are not atomic: earlier
/// writes stay applied when a later one fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub written: Vec<ExpiryRecord>,
    pub skipped: Vec<SkippedResource>,
    pub failed: Vec<FailedWrite>,
}

impl WriteReport {
    /// True when every attempted write succeeded
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn skip(&mut self, resource_id: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedResource {
            resource_id: resource_id.to_string(),
            reason: reason.into(),
        });
    }
}

/// Reconciler for one provider scope
#[derive(Debug, Clone)]
pub struct Reconciler {
    classifier: Classifier,
    scope: String,
    logger: StructuredLogger,
}

impl Reconciler {
    pub fn new(config: ClassifierConfig, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        let logger = StructuredLogger::new(config.provider, scope.clone());
        Self {
            classifier: Classifier::new(config),
            scope,
            logger,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Fetch a fresh snapshot; any adapter failure becomes a listing error
    pub async fn list_snapshot(&self, store: &dyn TagStore) -> Result<Vec<Resource>> {
        match store.list_resources(&self.scope).await {
            Ok(resources) => Ok(resources),
            Err(ScrubError::Listing { scope, message }) => {
                self.logger.log_listing_failed(&message);
                Err(ScrubError::Listing { scope, message })
            }
            Err(e) => {
                self.logger.log_listing_failed(&e.to_string());
                Err(ScrubError::Listing {
                    scope: self.scope.clone(),
                    message: e.to_string(),
                })
            }
        }
    }

    pub fn classify(&self, resources: &[Resource]) -> ClusterInventory {
        self.classifier.classify(resources)
    }

    /// Ids of non-ignored resources carrying no marker key, in snapshot order
    pub fn find_unmarked(&self, resources: &[Resource]) -> Vec<String> {
        let key = self.classifier.marker_key();
        let mut seen = HashSet::new();
        self.classifier
            .candidates(resources)
            .filter(|r| !r.has_tag(key))
            .filter(|r| seen.insert(r.id.as_str()))
            .map(|r| r.id.clone())
            .collect()
    }

    /// Every non-ignored resource that carries a marker
    pub fn expiry_records(&self, resources: &[Resource]) -> Vec<ExpiryRecord> {
        let key = self.classifier.marker_key();
        self.classifier
            .candidates(resources)
            .filter_map(|r| {
                r.tag(key).map(|expiry| ExpiryRecord {
                    resource_id: r.id.clone(),
                    expiry: expiry.to_string(),
                })
            })
            .collect()
    }

    /// Clusters whose marker has passed, still partitioned by type.
    /// Malformed markers are reported and treated as not expired.
    pub fn find_expired(&self, inventory: &ClusterInventory, now: NaiveDate) -> ClusterBuckets {
        let mut expired = ClusterBuckets::default();

        for group in inventory.groups() {
            let Some(marker) = group.expiry.as_deref() else {
                continue;
            };
            if parse_date(marker).is_err() {
                self.logger.log_malformed_date(&group.name, marker);
                continue;
            }
            if is_expired(marker, now) {
                self.logger.log_expired(&group.name, group.cluster_type, marker);
                expired.push(group.clone());
            }
        }

        expired
    }

    /// Write an initial marker on every unmarked resource.
    ///
    /// The marker measures from the resource's creation date when the adapter
    /// supplied one, otherwise from `now`.
    pub async fn tag_unmarked(
        &self,
        store: &dyn TagStore,
        resources: &[Resource],
        now: NaiveDate,
        offset_days: i64,
    ) -> WriteReport {
        let key = self.classifier.marker_key();
        let unmarked: HashSet<String> = self.find_unmarked(resources).into_iter().collect();
        let mut done: HashSet<&str> = HashSet::new();
        let mut report = WriteReport::default();

        for resource in self.classifier.candidates(resources) {
            if !unmarked.contains(&resource.id) || !done.insert(resource.id.as_str()) {
                continue;
            }

            let expiry = match &resource.created_on {
                Some(created) => compute_expiry(created, offset_days),
                None => shift_date(now, offset_days),
            };
            let expiry = match expiry {
                Ok(expiry) => expiry,
                Err(e) => {
                    if let ScrubError::MalformedDate { value } = &e {
                        self.logger.log_malformed_date(&resource.id, value);
                    }
                    report.skip(&resource.id, e.to_string());
                    continue;
                }
            };

            self.write(store, &resource.id, key, &expiry, &mut report).await;
        }

        report
    }

    /// Find the marked cluster named `target` (or containing a marked member
    /// with that id or name). Groups with malformed markers are not extendable.
    pub fn find_extend_target<'a>(
        &self,
        inventory: &'a ClusterInventory,
        target: &str,
    ) -> Option<&'a ClusterGroup> {
        let key = self.classifier.marker_key();
        let mut matches = inventory.groups().iter().filter(|group| {
            let named = group.name == target
                || group
                    .members
                    .iter()
                    .any(|m| (m.id == target || m.name == target) && m.has_tag(key));
            named && group.is_marked()
        });

        let found = matches.find(|group| match group.expiry.as_deref() {
            Some(marker) if parse_date(marker).is_ok() => true,
            Some(marker) => {
                self.logger.log_malformed_date(&group.name, marker);
                false
            }
            None => false,
        });

        if let Some(group) = found {
            if let Some(other) = matches.next() {
                debug!(
                    target = %target,
                    chosen = %group.name,
                    other = %other.name,
                    "Extend target matches several clusters, using the first"
                );
            }
        }
        found
    }

    /// Move a marked cluster's expiry to `now + extra_days` on every member
    /// that already carries a marker. Unmarked members are left for
    /// [`Reconciler::tag_unmarked`].
    ///
    /// The new date measures from `now`, not from the previous marker.
    /// Returns [`ScrubError::NoMatch`] when nothing markable matches.
    pub async fn extend_one(
        &self,
        store: &dyn TagStore,
        inventory: &ClusterInventory,
        target: &str,
        extra_days: i64,
        now: NaiveDate,
    ) -> Result<WriteReport> {
        let Some(group) = self.find_extend_target(inventory, target) else {
            self.logger.log_no_match(target);
            return Err(ScrubError::NoMatch {
                target: target.to_string(),
            });
        };

        let expiry = shift_date(now, extra_days)?;
        let key = self.classifier.marker_key();
        let mut report = WriteReport::default();

        for member in &group.members {
            if !member.has_tag(key) {
                report.skip(&member.id, "no expiry marker");
                continue;
            }
            self.write(store, &member.id, key, &expiry, &mut report).await;
        }

        self.logger
            .log_extended(&group.name, &expiry, report.written.len());
        Ok(report)
    }

    async fn write(
        &self,
        store: &dyn TagStore,
        resource_id: &str,
        key: &str,
        expiry: &str,
        report: &mut WriteReport,
    ) {
        match store.write_marker(&self.scope, resource_id, key, expiry).await {
            Ok(()) => {
                self.logger.log_marker_written(resource_id, key, expiry);
                report.written.push(ExpiryRecord {
                    resource_id: resource_id.to_string(),
                    expiry: expiry.to_string(),
                });
            }
            Err(e) => {
                self.logger.log_write_failed(resource_id, &e.to_string());
                report.failed.push(FailedWrite {
                    resource_id: resource_id.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterType, Provider};
    use crate::store::{async_trait, Inventory, InventoryEntry, InventoryStore};
    use std::sync::Mutex;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store_with(provider: Provider, scope: &str, resources: &[Resource]) -> InventoryStore {
        InventoryStore::new(
            provider,
            Inventory {
                resources: resources
                    .iter()
                    .cloned()
                    .map(|r| InventoryEntry::new(provider, scope, r))
                    .collect(),
            },
        )
    }

    /// Store that rejects writes for selected resources
    struct FlakyStore {
        inner: InventoryStore,
        reject: Vec<String>,
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TagStore for FlakyStore {
        fn provider(&self) -> Provider {
            self.inner.provider()
        }

        async fn list_resources(&self, scope: &str) -> Result<Vec<Resource>> {
            self.inner.list_resources(scope).await
        }

        async fn write_marker(&self, scope: &str, id: &str, key: &str, value: &str) -> Result<()> {
            self.attempts.lock().unwrap().push(id.to_string());
            if self.reject.iter().any(|r| r == id) {
                return Err(ScrubError::Write {
                    resource_id: id.to_string(),
                    message: "permission denied".into(),
                });
            }
            self.inner.write_marker(scope, id, key, value).await
        }
    }

    /// Store whose listing always fails
    struct DownStore;

    #[async_trait]
    impl TagStore for DownStore {
        fn provider(&self) -> Provider {
            Provider::Aws
        }

        async fn list_resources(&self, _scope: &str) -> Result<Vec<Resource>> {
            Err(ScrubError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        }

        async fn write_marker(
            &self,
            _scope: &str,
            _id: &str,
            _key: &str,
            _value: &str,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unmarked_and_expired_vpcs() {
        let reconciler = Reconciler::new(ClassifierConfig::aws(), "us-east-1");
        let snapshot = vec![
            Resource::new("A").with_tag("expiryTag", "2023-01-01"),
            Resource::new("B").with_tag("Name", "x"),
        ];

        assert_eq!(reconciler.find_unmarked(&snapshot), vec!["B"]);

        let inventory = reconciler.classify(&snapshot);
        let expired = reconciler.find_expired(&inventory, ymd(2023, 2, 1));
        assert_eq!(expired.total(), 1);
        let ids: Vec<&str> = expired.get(ClusterType::Other)[0].member_ids().collect();
        assert_eq!(ids, vec!["A"]);
    }

    #[test]
    fn test_any_marker_value_counts_as_marked() {
        let reconciler = Reconciler::new(ClassifierConfig::azure(), "sub");
        let snapshot = vec![
            Resource::new("rg-1").with_tag("expirytag", "garbage"),
            Resource::new("rg-2").with_tag("expirytag", ""),
            Resource::new("rg-3"),
            Resource::new("NetworkWatcherRG"),
        ];
        assert_eq!(reconciler.find_unmarked(&snapshot), vec!["rg-3"]);
    }

    #[test]
    fn test_malformed_marker_is_not_expired() {
        let reconciler = Reconciler::new(ClassifierConfig::azure(), "sub");
        let snapshot = vec![
            Resource::new("rg-1").with_tag("expirytag", "01/01/2020"),
            Resource::new("rg-2").with_tag("expirytag", "2020-01-01"),
        ];

        let inventory = reconciler.classify(&snapshot);
        let expired = reconciler.find_expired(&inventory, ymd(2023, 2, 1));
        assert_eq!(expired.names(ClusterType::Other), vec!["rg-2"]);
    }

    #[test]
    fn test_expired_keeps_type_partition() {
        let reconciler = Reconciler::new(ClassifierConfig::azure(), "sub");
        let snapshot = vec![
            Resource::new("NG").with_tag("aks-managed-cluster-rg", "aks-rg"),
            Resource::new("aks-rg").with_tag("expirytag", "2023-01-01"),
            Resource::new("ocp-rg")
                .with_tag("kubernetes.io_cluster.ocp", "owned")
                .with_tag("expirytag", "2023-01-15"),
            Resource::new("fresh-rg").with_tag("expirytag", "2099-01-01"),
        ];

        let inventory = reconciler.classify(&snapshot);
        let expired = reconciler.find_expired(&inventory, ymd(2023, 2, 1));

        assert_eq!(expired.names(ClusterType::ManagedService), vec!["aks-rg"]);
        assert_eq!(expired.names(ClusterType::SelfManagedInstall), vec!["ocp-rg"]);
        assert!(expired.get(ClusterType::Other).is_empty());
    }

    #[tokio::test]
    async fn test_tag_unmarked_uses_creation_date_or_now() {
        let snapshot = vec![
            Resource::new("vpc-1").with_created_on("2023-01-10"),
            Resource::new("vpc-2"),
            Resource::new("vpc-3").with_tag("expiryTag", "2023-01-01"),
        ];
        let store = store_with(Provider::Aws, "us-east-1", &snapshot);
        let reconciler = Reconciler::new(ClassifierConfig::aws(), "us-east-1");

        let report = reconciler
            .tag_unmarked(&store, &snapshot, ymd(2023, 2, 1), 3)
            .await;

        assert!(report.is_clean());
        assert_eq!(
            report.written,
            vec![
                ExpiryRecord {
                    resource_id: "vpc-1".into(),
                    expiry: "2023-01-13".into()
                },
                ExpiryRecord {
                    resource_id: "vpc-2".into(),
                    expiry: "2023-02-04".into()
                },
            ]
        );

        let after = store.list_resources("us-east-1").await.unwrap();
        assert!(reconciler.find_unmarked(&after).is_empty());
        assert_eq!(after[2].tag("expiryTag"), Some("2023-01-01"));
    }

    #[tokio::test]
    async fn test_tag_unmarked_skips_malformed_creation_date() {
        let snapshot = vec![
            Resource::new("vpc-1").with_created_on("Jan 10"),
            Resource::new("vpc-2"),
        ];
        let store = store_with(Provider::Aws, "us-east-1", &snapshot);
        let reconciler = Reconciler::new(ClassifierConfig::aws(), "us-east-1");

        let report = reconciler
            .tag_unmarked(&store, &snapshot, ymd(2023, 2, 1), 3)
            .await;

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].resource_id, "vpc-1");
        assert_eq!(report.written.len(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_does_not_stop_batch() {
        let snapshot = vec![Resource::new("rg-1"), Resource::new("rg-2"), Resource::new("rg-3")];
        let store = FlakyStore {
            inner: store_with(Provider::Azure, "sub", &snapshot),
            reject: vec!["rg-2".into()],
            attempts: Mutex::new(Vec::new()),
        };
        let reconciler = Reconciler::new(ClassifierConfig::azure(), "sub");

        let report = reconciler
            .tag_unmarked(&store, &snapshot, ymd(2023, 2, 1), 3)
            .await;

        assert_eq!(*store.attempts.lock().unwrap(), vec!["rg-1", "rg-2", "rg-3"]);
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].resource_id, "rg-2");
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_extend_measures_from_now() {
        let snapshot = vec![Resource::new("cluster1-rg").with_tag("expirytag", "2023-06-30")];
        let store = store_with(Provider::Azure, "sub", &snapshot);
        let reconciler = Reconciler::new(ClassifierConfig::azure(), "sub");
        let inventory = reconciler.classify(&snapshot);

        let report = reconciler
            .extend_one(&store, &inventory, "cluster1-rg", 5, ymd(2023, 2, 1))
            .await
            .unwrap();

        assert_eq!(report.written[0].expiry, "2023-02-06");
        let after = store.list_resources("sub").await.unwrap();
        assert_eq!(after[0].tag("expirytag"), Some("2023-02-06"));
    }

    #[tokio::test]
    async fn test_extend_rewrites_only_marked_members() {
        let snapshot = vec![
            Resource::new("foo-master-0")
                .with_tag("kubernetes-io-cluster-foo", "owned")
                .with_tag("expirytag", "2023-01-01"),
            Resource::new("foo-worker-0").with_tag("kubernetes-io-cluster-foo", "owned"),
            Resource::new("foo-worker-1")
                .with_tag("kubernetes-io-cluster-foo", "owned")
                .with_tag("expirytag", "2023-01-02"),
        ];
        let store = store_with(Provider::Gcp, "proj", &snapshot);
        let reconciler = Reconciler::new(ClassifierConfig::gcp(), "proj");
        let inventory = reconciler.classify(&snapshot);

        let report = reconciler
            .extend_one(&store, &inventory, "foo", 3, ymd(2023, 2, 1))
            .await
            .unwrap();

        let written: Vec<&str> = report.written.iter().map(|w| w.resource_id.as_str()).collect();
        assert_eq!(written, vec!["foo-master-0", "foo-worker-1"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].resource_id, "foo-worker-0");

        let after = store.list_resources("proj").await.unwrap();
        assert_eq!(after[0].tag("expirytag"), Some("2023-02-04"));
        assert!(!after[1].has_tag("expirytag"));
        assert_eq!(after[2].tag("expirytag"), Some("2023-02-04"));
    }

    #[tokio::test]
    async fn test_extend_unmarked_target_is_noop() {
        let snapshot = vec![
            Resource::new("rg-1"),
            Resource::new("rg-2").with_tag("expirytag", "bogus"),
        ];
        let store = store_with(Provider::Azure, "sub", &snapshot);
        let reconciler = Reconciler::new(ClassifierConfig::azure(), "sub");
        let inventory = reconciler.classify(&snapshot);

        for target in ["rg-1", "rg-2", "missing"] {
            let err = reconciler
                .extend_one(&store, &inventory, target, 3, ymd(2023, 2, 1))
                .await
                .unwrap_err();
            assert!(matches!(err, ScrubError::NoMatch { .. }), "target {target}");
        }

        let after = store.list_resources("sub").await.unwrap();
        assert!(!after[0].has_tag("expirytag"));
        assert_eq!(after[1].tag("expirytag"), Some("bogus"));
    }

    #[tokio::test]
    async fn test_listing_failure_becomes_listing_error() {
        let reconciler = Reconciler::new(ClassifierConfig::aws(), "us-east-1");
        let err = reconciler.list_snapshot(&DownStore).await.unwrap_err();
        match err {
            ScrubError::Listing { scope, message } => {
                assert_eq!(scope, "us-east-1");
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected listing error, got {other}"),
        }
    }

    #[test]
    fn test_expiry_records_skip_ignored() {
        let reconciler = Reconciler::new(ClassifierConfig::azure(), "sub");
        let snapshot = vec![
            Resource::new("NetworkWatcherRG").with_tag("expirytag", "2023-01-01"),
            Resource::new("rg-1").with_tag("expirytag", "2023-01-02"),
        ];
        let records = reconciler.expiry_records(&snapshot);
        assert_eq!(
            records,
            vec![ExpiryRecord {
                resource_id: "rg-1".into(),
                expiry: "2023-01-02".into()
            }]
        );
    }
}
