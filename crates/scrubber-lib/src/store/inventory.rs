//! File-backed inventory store
//!
//! Holds a JSON snapshot of resources for any number of providers and
//! scopes. Marker writes update the in-memory copy and, when the store was
//! opened from a file, are flushed back to disk immediately.

use super::{async_trait, TagStore};
use crate::error::{Result, ScrubError};
use crate::models::{Provider, Resource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Serialized inventory document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub resources: Vec<InventoryEntry>,
}

/// One resource together with where it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub provider: Provider,
    pub scope: String,
    #[serde(flatten)]
    pub resource: Resource,
}

impl InventoryEntry {
    pub fn new(provider: Provider, scope: impl Into<String>, resource: Resource) -> Self {
        Self {
            provider,
            scope: scope.into(),
            resource,
        }
    }
}

/// [`TagStore`] over an [`Inventory`] document
pub struct InventoryStore {
    provider: Provider,
    inventory: RwLock<Inventory>,
    persistence_path: Option<PathBuf>,
}

impl InventoryStore {
    /// Create an in-memory store
    pub fn new(provider: Provider, inventory: Inventory) -> Self {
        Self {
            provider,
            inventory: RwLock::new(inventory),
            persistence_path: None,
        }
    }

    /// Load a store from a JSON file; writes are persisted back to it
    pub async fn open(path: impl AsRef<Path>, provider: Provider) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = tokio::fs::read_to_string(&path).await?;
        let inventory: Inventory = serde_json::from_str(&content)?;

        info!(
            path = %path.display(),
            resources = inventory.resources.len(),
            provider = %provider,
            "Loaded inventory"
        );

        Ok(Self {
            provider,
            inventory: RwLock::new(inventory),
            persistence_path: Some(path),
        })
    }

    /// Write a document to disk if this store is file-backed
    async fn persist(&self, inventory: &Inventory) -> Result<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(inventory)?;

        // Sibling temp file, then rename over the original
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        debug!(path = %path.display(), "Flushed inventory");
        Ok(())
    }
}

#[async_trait]
impl TagStore for InventoryStore {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn list_resources(&self, scope: &str) -> Result<Vec<Resource>> {
        let inventory = self.inventory.read().await;
        Ok(inventory
            .resources
            .iter()
            .filter(|e| e.provider == self.provider && e.scope == scope)
            .map(|e| e.resource.clone())
            .collect())
    }

    async fn write_marker(
        &self,
        scope: &str,
        resource_id: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut inventory = self.inventory.write().await;
        let mut updated = inventory.clone();
        let entry = updated
            .resources
            .iter_mut()
            .find(|e| e.provider == self.provider && e.scope == scope && e.resource.id == resource_id)
            .ok_or_else(|| ScrubError::Write {
                resource_id: resource_id.to_string(),
                message: format!("resource not found in scope {scope}"),
            })?;
        entry.resource.tags.insert(key.to_string(), value.to_string());

        // Memory only changes once the document is on disk
        self.persist(&updated).await.map_err(|e| ScrubError::Write {
            resource_id: resource_id.to_string(),
            message: e.to_string(),
        })?;
        *inventory = updated;
        Ok(())
    }
}
