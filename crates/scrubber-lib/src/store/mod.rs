//! Tag and label store adapters
//!
//! The core never talks to a provider SDK. It consumes a [`TagStore`] that
//! lists a complete snapshot for one scope and overwrites single marker keys.

mod inventory;

pub use inventory::{Inventory, InventoryEntry, InventoryStore};

use crate::error::Result;
use crate::models::{Provider, Resource};

pub use async_trait::async_trait;

/// Read and write key-value metadata on provider resources
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Provider this store talks to
    fn provider(&self) -> Provider;

    /// List every resource in a scope (region, project, subscription).
    /// Implementations exhaust pagination before returning.
    async fn list_resources(&self, scope: &str) -> Result<Vec<Resource>>;

    /// Overwrite one metadata key on a resource
    async fn write_marker(&self, scope: &str, resource_id: &str, key: &str, value: &str)
        -> Result<()>;
}
