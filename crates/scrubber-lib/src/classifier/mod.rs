//! Cluster classification
//!
//! Groups a provider snapshot into named clusters and assigns each a
//! [`ClusterType`]. Classification runs in fixed passes over the snapshot:
//!
//! 1. ignore-list filtering
//! 2. ordered rule table (first match wins)
//! 3. two-hop owner references (a resource naming its owner by tag value)
//! 4. everything still unassigned becomes [`ClusterType::Other`]
//!
//! Assignment is keyed by resource id, so a resource is typed exactly once.

mod rules;


pub use rules::{
    ClassificationRule, ClassifierConfig, NameSource, OwnerReference, TagMatcher, OWNED_SENTINEL,
};

use crate::expiry::parse_date;
use crate::models::{ClusterGroup, ClusterType, Resource};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// Rule-driven classifier for one provider
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn marker_key(&self) -> &str {
        &self.config.marker_key
    }

    /// Resources not excluded by the ignore-list, in snapshot order
    pub fn candidates<'a>(
        &'a self,
        resources: &'a [Resource],
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        resources.iter().filter(move |r| !self.config.is_ignored(r))
    }

    /// Assign a cluster type to every non-ignored resource, keyed by resource id
    pub fn assign_types<'a>(&self, resources: &'a [Resource]) -> HashMap<&'a str, ClusterType> {
        let candidates: Vec<&'a Resource> = resources
            .iter()
            .filter(|r| !self.config.is_ignored(r))
            .collect();
        let mut assigned: HashMap<&'a str, ClusterType> = HashMap::new();
        let mut linking: Vec<&'a Resource> = Vec::new();

        for resource in candidates.iter().copied() {
            if assigned.contains_key(resource.id.as_str()) {
                continue;
            }
            if let Some(cluster_type) = self.config.match_type(resource) {
                assigned.insert(&resource.id, cluster_type);
            } else if let Some(owner) = &self.config.owner_reference {
                if resource.has_tag(&owner.tag_key) {
                    linking.push(resource);
                }
            }
        }

        if let Some(owner) = &self.config.owner_reference {
            for link in &linking {
                let Some(target) = link.tag(&owner.tag_key) else {
                    continue;
                };
                for candidate in candidates.iter().copied().filter(|c| c.name == target) {
                    if assigned.contains_key(candidate.id.as_str()) {
                        continue;
                    }
                    debug!(
                        referencing = %link.id,
                        owner = %candidate.id,
                        "Resolved owner reference"
                    );
                    assigned.insert(&candidate.id, owner.cluster_type);
                }
            }
        }

        for resource in candidates.iter().copied() {
            assigned.entry(&resource.id).or_insert(ClusterType::Other);
        }

        assigned
    }

    /// Group a snapshot into clusters
    pub fn classify(&self, resources: &[Resource]) -> ClusterInventory {
        let assigned = self.assign_types(resources);
        let mut inventory = ClusterInventory::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for resource in self.candidates(resources) {
            if !seen.insert(resource.id.as_str()) {
                continue;
            }
            let cluster_type = assigned
                .get(resource.id.as_str())
                .copied()
                .unwrap_or(ClusterType::Other);
            let name = self.config.cluster_name(resource);
            inventory.insert(name, cluster_type, resource.clone());
        }

        let marker_key = self.config.marker_key.as_str();
        for group in &mut inventory.groups {
            group.expiry = resolve_expiry(&group.name, &group.members, marker_key);
        }

        debug!(
            provider = %self.config.provider,
            resources = resources.len(),
            clusters = inventory.len(),
            "Classified snapshot"
        );
        inventory
    }
}

/// Pick the group marker from its members.
///
/// The latest well-formed date wins. A malformed value is only used when no
/// member carries a valid one, so the group still counts as marked.
fn resolve_expiry(cluster: &str, members: &[Resource], marker_key: &str) -> Option<String> {
    let values: Vec<&str> = members.iter().filter_map(|m| m.tag(marker_key)).collect();
    let valid: Vec<&str> = values
        .iter()
        .copied()
        .filter(|v| parse_date(v).is_ok())
        .collect();

    let latest = valid.iter().copied().max();
    if let Some(latest) = latest {
        if valid.iter().any(|v| *v != latest) {
            warn!(
                cluster = %cluster,
                chosen = %latest,
                markers = ?valid,
                "Cluster members disagree on expiry marker, using latest"
            );
        }
        return Some(latest.to_string());
    }

    values.first().map(|v| v.to_string())
}

/// Clusters derived from one snapshot, in first-appearance order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterInventory {
    groups: Vec<ClusterGroup>,
    index: HashMap<String, usize>,
}

impl ClusterInventory {
    fn insert(&mut self, name: String, cluster_type: ClusterType, resource: Resource) {
        if let Some(&i) = self.index.get(&name) {
            let group = &mut self.groups[i];
            // Highest-priority member type wins; Other only when no member matched
            if cluster_type < group.cluster_type {
                debug!(
                    cluster = %name,
                    resource = %resource.id,
                    previous = ?group.cluster_type,
                    resolved = ?cluster_type,
                    "Member raises cluster type"
                );
                group.cluster_type = cluster_type;
            }
            group.members.push(resource);
            return;
        }

        self.index.insert(name.clone(), self.groups.len());
        self.groups.push(ClusterGroup {
            name,
            cluster_type,
            members: vec![resource],
            expiry: None,
        });
    }

    pub fn groups(&self) -> &[ClusterGroup] {
        &self.groups
    }

    pub fn get(&self, name: &str) -> Option<&ClusterGroup> {
        self.index.get(name).map(|&i| &self.groups[i])
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Cluster name to group mapping
    pub fn by_name(&self) -> BTreeMap<&str, &ClusterGroup> {
        self.groups.iter().map(|g| (g.name.as_str(), g)).collect()
    }

    /// Partition groups by cluster type, preserving order
    pub fn buckets(&self) -> ClusterBuckets {
        let mut buckets = ClusterBuckets::default();
        for group in &self.groups {
            buckets.push(group.clone());
        }
        buckets
    }
}

/// Cluster groups partitioned by [`ClusterType`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterBuckets {
    buckets: BTreeMap<ClusterType, Vec<ClusterGroup>>,
}

impl ClusterBuckets {
    pub fn push(&mut self, group: ClusterGroup) {
        self.buckets.entry(group.cluster_type).or_default().push(group);
    }

    /// Groups of one type, empty if none
    pub fn get(&self, cluster_type: ClusterType) -> &[ClusterGroup] {
        self.buckets
            .get(&cluster_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate every type in report order, including empty ones
    pub fn iter(&self) -> impl Iterator<Item = (ClusterType, &[ClusterGroup])> {
        ClusterType::ALL.into_iter().map(move |t| (t, self.get(t)))
    }

    /// Total number of groups across all types
    pub fn total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Names of the groups of one type
    pub fn names(&self, cluster_type: ClusterType) -> Vec<&str> {
        self.get(cluster_type).iter().map(|g| g.name.as_str()).collect()
    }
}
