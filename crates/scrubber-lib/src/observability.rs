//! Structured logging for scrubber passes
//!
//! Every decision that changes or reports resource state is emitted as one
//! tracing event with an `event` field, so JSON logs can be filtered per
//! decision type.

use crate::models::{ClusterType, Provider};
use tracing::{error, info, warn};

/// Structured logger bound to one provider pass
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    provider: Provider,
    scope: String,
}

impl StructuredLogger {
    pub fn new(provider: Provider, scope: impl Into<String>) -> Self {
        Self {
            provider,
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Log the start of a pass
    pub fn log_pass_started(&self, mode: &str) {
        info!(
            event = "pass_started",
            provider = %self.provider,
            scope = %self.scope,
            mode = %mode,
            "Starting scrub pass"
        );
    }

    /// Log the end of a pass with its result size
    pub fn log_pass_finished(&self, mode: &str, results: usize) {
        info!(
            event = "pass_finished",
            provider = %self.provider,
            scope = %self.scope,
            mode = %mode,
            results = results,
            "Finished scrub pass"
        );
    }

    /// Log a listing failure that aborts the pass
    pub fn log_listing_failed(&self, error: &str) {
        error!(
            event = "listing_failed",
            provider = %self.provider,
            scope = %self.scope,
            error = %error,
            "Failed to list resources, skipping pass"
        );
    }

    /// Log a marker written to a resource
    pub fn log_marker_written(&self, resource_id: &str, key: &str, expiry: &str) {
        info!(
            event = "marker_written",
            provider = %self.provider,
            scope = %self.scope,
            resource_id = %resource_id,
            key = %key,
            expiry = %expiry,
            "Wrote expiry marker"
        );
    }

    /// Log a failed marker write
    pub fn log_write_failed(&self, resource_id: &str, error: &str) {
        warn!(
            event = "marker_write_failed",
            provider = %self.provider,
            scope = %self.scope,
            resource_id = %resource_id,
            error = %error,
            "Failed to write expiry marker"
        );
    }

    /// Log a marker or creation date that does not parse
    pub fn log_malformed_date(&self, resource: &str, value: &str) {
        warn!(
            event = "malformed_date",
            provider = %self.provider,
            scope = %self.scope,
            resource = %resource,
            value = %value,
            "Ignoring malformed date"
        );
    }

    /// Log an expired cluster
    pub fn log_expired(&self, cluster: &str, cluster_type: ClusterType, expiry: &str) {
        info!(
            event = "cluster_expired",
            provider = %self.provider,
            scope = %self.scope,
            cluster = %cluster,
            cluster_type = ?cluster_type,
            expiry = %expiry,
            "Cluster is past its expiry date"
        );
    }

    /// Log the outcome of an extend request
    pub fn log_extended(&self, cluster: &str, new_expiry: &str, members: usize) {
        info!(
            event = "cluster_extended",
            provider = %self.provider,
            scope = %self.scope,
            cluster = %cluster,
            new_expiry = %new_expiry,
            members = members,
            "Extended cluster expiry"
        );
    }

    /// Log an extend target that matched nothing markable
    pub fn log_no_match(&self, target: &str) {
        warn!(
            event = "extend_no_match",
            provider = %self.provider,
            scope = %self.scope,
            target = %target,
            "No marked cluster matches extend target"
        );
    }
}
