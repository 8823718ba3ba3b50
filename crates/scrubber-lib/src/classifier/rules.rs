//! Tagging conventions and per-provider classifier presets
//!
//! Every provider is described by data: an ordered rule table mapping tag
//! predicates to cluster types, an ordered list of cluster-name sources, an
//! optional two-hop owner reference, and a static ignore-list.

use crate::models::{ClusterType, Provider, Resource};

/// Sentinel value for the "owned" label convention
pub const OWNED_SENTINEL: &str = "owned";

/// Predicate over a resource's tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMatcher {
    /// Some tag key contains the substring
    KeyContains(String),
    /// Some tag key contains the substring and its value equals `value`
    KeyContainsWithValue { key: String, value: String },
    /// A tag key equals `prefix` followed by the resource name minus `trim_suffix`
    KeyFromName { prefix: String, trim_suffix: String },
}

impl TagMatcher {
    pub fn matches(&self, resource: &Resource) -> bool {
        match self {
            TagMatcher::KeyContains(needle) => resource.tags.keys().any(|k| k.contains(needle.as_str())),
            TagMatcher::KeyContainsWithValue { key, value } => resource
                .tags
                .iter()
                .any(|(k, v)| k.contains(key.as_str()) && v.as_str() == value.as_str()),
            TagMatcher::KeyFromName { prefix, trim_suffix } => {
                let base = resource
                    .name
                    .strip_suffix(trim_suffix.as_str())
                    .unwrap_or(&resource.name);
                resource.has_tag(&format!("{prefix}{base}"))
            }
        }
    }
}

/// One row of the ordered rule table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    pub matcher: TagMatcher,
    pub cluster_type: ClusterType,
}

impl ClassificationRule {
    pub fn new(matcher: TagMatcher, cluster_type: ClusterType) -> Self {
        Self {
            matcher,
            cluster_type,
        }
    }
}

/// Where a cluster name comes from, tried in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameSource {
    /// Key containing `prefix` with value `sentinel`; name is the key minus the prefix
    OwnedKey { prefix: String, sentinel: String },
    /// Value of a literal tag key
    TagValue(String),
    ResourceName,
    ResourceId,
}

impl NameSource {
    pub fn derive(&self, resource: &Resource) -> Option<String> {
        let name = match self {
            NameSource::OwnedKey { prefix, sentinel } => resource
                .tags
                .iter()
                .find(|(k, v)| v.as_str() == sentinel.as_str() && k.contains(prefix.as_str()))
                .map(|(k, _)| k.strip_prefix(prefix.as_str()).unwrap_or(k).to_string()),
            NameSource::TagValue(key) => resource.tag(key).map(str::to_string),
            NameSource::ResourceName => Some(resource.name.clone()),
            NameSource::ResourceId => Some(resource.id.clone()),
        };
        name.filter(|n| !n.is_empty())
    }
}

/// Tag through which a resource names the resource that owns its cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerReference {
    pub tag_key: String,
    /// Type assigned to the referenced resource
    pub cluster_type: ClusterType,
}

/// Immutable classifier configuration for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub provider: Provider,
    /// Tag/label key holding the expiry marker
    pub marker_key: String,
    /// Name substrings excluded from all classification
    pub ignore_list: Vec<String>,
    pub rules: Vec<ClassificationRule>,
    pub name_sources: Vec<NameSource>,
    pub owner_reference: Option<OwnerReference>,
}

impl ClassifierConfig {
    /// Preset for a provider
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Aws => Self::aws(),
            Provider::Gcp => Self::gcp(),
            Provider::Azure => Self::azure(),
        }
    }

    /// VPCs tagged by eksctl, the OpenShift installer, or ROSA
    pub fn aws() -> Self {
        Self {
            provider: Provider::Aws,
            marker_key: "expiryTag".to_string(),
            ignore_list: Vec::new(),
            rules: vec![
                ClassificationRule::new(
                    TagMatcher::KeyContains("alpha.eksctl.io/cluster-name".into()),
                    ClusterType::ManagedService,
                ),
                ClassificationRule::new(
                    TagMatcher::KeyContains("kubernetes.io/cluster/".into()),
                    ClusterType::SelfManagedInstall,
                ),
                ClassificationRule::new(
                    TagMatcher::KeyContains("red-hat-managed".into()),
                    ClusterType::ManagedPlatform,
                ),
            ],
            name_sources: vec![NameSource::TagValue("Name".into()), NameSource::ResourceId],
            owner_reference: None,
        }
    }

    /// Compute instances labelled by GKE or the OpenShift installer
    pub fn gcp() -> Self {
        Self {
            provider: Provider::Gcp,
            marker_key: "expirytag".to_string(),
            ignore_list: Vec::new(),
            rules: vec![
                ClassificationRule::new(
                    TagMatcher::KeyContains("goog-k8s-cluster-name".into()),
                    ClusterType::ManagedService,
                ),
                ClassificationRule::new(
                    TagMatcher::KeyContainsWithValue {
                        key: "kubernetes-io-cluster-".into(),
                        value: OWNED_SENTINEL.into(),
                    },
                    ClusterType::SelfManagedInstall,
                ),
            ],
            name_sources: vec![
                NameSource::OwnedKey {
                    prefix: "kubernetes-io-cluster-".into(),
                    sentinel: OWNED_SENTINEL.into(),
                },
                NameSource::TagValue("goog-k8s-cluster-name".into()),
                NameSource::ResourceName,
            ],
            owner_reference: None,
        }
    }

    /// Resource groups; AKS node groups point at their cluster group
    pub fn azure() -> Self {
        Self {
            provider: Provider::Azure,
            marker_key: "expirytag".to_string(),
            ignore_list: [
                "DefaultResourceGroup-EUS",
                "NetworkWatcherRG",
                "os4-common",
                "domain",
                "az.red-chesterfield.com",
                "cloud-shell-storage-",
                "jnp-a_group",
                "MC_jnp-a_group_jnp-aro_centralus",
                "MA_defaultazuremonitorworkspace-cus_centralus_managed",
                "MC_clc-aks",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            rules: vec![ClassificationRule::new(
                TagMatcher::KeyFromName {
                    prefix: "kubernetes.io_cluster.".into(),
                    trim_suffix: "-rg".into(),
                },
                ClusterType::SelfManagedInstall,
            )],
            name_sources: vec![NameSource::ResourceName],
            owner_reference: Some(OwnerReference {
                tag_key: "aks-managed-cluster-rg".into(),
                cluster_type: ClusterType::ManagedService,
            }),
        }
    }

    /// Append extra ignore-list entries
    pub fn with_extra_ignores<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_list.extend(extra.into_iter().map(Into::into));
        self
    }

    /// Override the marker key
    pub fn with_marker_key(mut self, key: impl Into<String>) -> Self {
        self.marker_key = key.into();
        self
    }

    pub fn is_ignored(&self, resource: &Resource) -> bool {
        self.ignore_list
            .iter()
            .any(|entry| resource.name.contains(entry.as_str()))
    }

    /// First matching rule wins; `None` means no convention applies
    pub fn match_type(&self, resource: &Resource) -> Option<ClusterType> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(resource))
            .map(|rule| rule.cluster_type)
    }

    /// Cluster name from the first name source that yields one
    pub fn cluster_name(&self, resource: &Resource) -> String {
        self.name_sources
            .iter()
            .find_map(|source| source.derive(resource))
            .unwrap_or_else(|| resource.id.clone())
    }
}
