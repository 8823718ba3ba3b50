//! Multi-cloud resource scrubber library
//!
//! This crate provides the core functionality for:
//! - Classifying VPCs, instances and resource groups into clusters
//! - Computing and checking expiry markers
//! - Reconciling markers (tag unmarked, report expired, extend)
//! - Reading and writing markers through a store adapter

pub mod classifier;
pub mod error;
pub mod expiry;
pub mod models;
pub mod observability;
pub mod reconciler;
pub mod store;

pub use classifier::{Classifier, ClassifierConfig, ClusterBuckets, ClusterInventory};
pub use error::{Result, ScrubError};
pub use models::*;
pub use observability::StructuredLogger;
pub use reconciler::{FailedWrite, Reconciler, SkippedResource, WriteReport};
pub use store::{InventoryStore, TagStore};
