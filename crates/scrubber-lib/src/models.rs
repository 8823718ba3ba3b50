//! Core data models for the scrubber

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Cloud provider a resource snapshot was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
    Azure,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Azure => "azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            "gcp" | "gcloud" | "google" => Ok(Provider::Gcp),
            "azure" => Ok(Provider::Azure),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// A provider-native resource (VPC, instance, resource group) with its tags or labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Opaque identifier (VPC id, instance name, resource group name)
    pub id: String,
    /// Display name used for ignore-list matching and two-hop lookups
    pub name: String,
    /// Tags or labels as returned by the listing call
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Creation date (`YYYY-MM-DD`) when the adapter knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    /// Zone or location the resource lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Resource {
    /// Create a resource whose name equals its id
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            tags: BTreeMap::new(),
            created_on: None,
            location: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_created_on(mut self, date: impl Into<String>) -> Self {
        self.created_on = Some(date.into());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }
}

/// How a cluster was provisioned. Variant order is classification priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterType {
    /// EKS/AKS/GKE style managed control plane
    ManagedService,
    /// Installer-provisioned (IPI) cluster
    SelfManagedInstall,
    /// Fully managed platform such as ROSA
    ManagedPlatform,
    /// Matches no known tagging convention
    Other,
}

impl ClusterType {
    /// All variants in report order
    pub const ALL: [ClusterType; 4] = [
        ClusterType::ManagedService,
        ClusterType::SelfManagedInstall,
        ClusterType::ManagedPlatform,
        ClusterType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ClusterType::ManagedService => "Managed Service",
            ClusterType::SelfManagedInstall => "Self-Managed Install",
            ClusterType::ManagedPlatform => "Managed Platform",
            ClusterType::Other => "Other/Uncategorized",
        }
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resources belonging to one logical cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterGroup {
    pub name: String,
    pub cluster_type: ClusterType,
    /// Members in snapshot order; never empty
    pub members: Vec<Resource>,
    /// Group-level expiry marker resolved from the members
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

impl ClusterGroup {
    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.id.as_str())
    }

    pub fn is_marked(&self) -> bool {
        self.expiry.is_some()
    }
}

/// A resource currently carrying an expiry marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryRecord {
    pub resource_id: String,
    pub expiry: String,
}
