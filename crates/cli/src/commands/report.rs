//! Cluster and expiry reports

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use scrubber_lib::{ClusterGroup, ClusterType, Provider, Reconciler, TagStore};
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::output::{color_expiry, print_heading, print_json, print_table, OutputFormat};

/// Row for the cluster table
#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Cluster")]
    name: String,
    #[tabled(rename = "Type")]
    cluster_type: String,
    #[tabled(rename = "Members")]
    members: usize,
    #[tabled(rename = "Expiry")]
    expiry: String,
}

impl ClusterRow {
    fn new(group: &ClusterGroup, today: NaiveDate) -> Self {
        Self {
            name: group.name.clone(),
            cluster_type: group.cluster_type.label().to_string(),
            members: group.members.len(),
            expiry: color_expiry(group.expiry.as_deref(), today),
        }
    }
}

#[derive(Serialize)]
struct ClusterListing<'a> {
    provider: Provider,
    scope: &'a str,
    clusters: BTreeMap<&'a str, &'a ClusterGroup>,
}

#[derive(Serialize)]
struct ExpiredSection<'a> {
    cluster_type: ClusterType,
    clusters: &'a [ClusterGroup],
}

#[derive(Serialize)]
struct ExpiredListing<'a> {
    provider: Provider,
    scope: &'a str,
    as_of: String,
    expired: Vec<ExpiredSection<'a>>,
}

/// Print every cluster in scope with its type, size and marker
pub async fn list_clusters(
    reconciler: &Reconciler,
    store: &dyn TagStore,
    today: NaiveDate,
    format: OutputFormat,
) -> Result<()> {
    const MODE: &str = "list-clusters";
    let logger = reconciler.logger();
    logger.log_pass_started(MODE);

    let resources = reconciler.list_snapshot(store).await?;
    let inventory = reconciler.classify(&resources);
    logger.log_pass_finished(MODE, inventory.len());

    match format {
        OutputFormat::Json => print_json(&ClusterListing {
            provider: store.provider(),
            scope: reconciler.scope(),
            clusters: inventory.by_name(),
        })?,
        OutputFormat::Table => {
            print_heading(&format!("Clusters in {} ({})", reconciler.scope(), store.provider()));
            let rows: Vec<ClusterRow> = inventory
                .groups()
                .iter()
                .map(|g| ClusterRow::new(g, today))
                .collect();
            print_table(&rows, "No clusters found");
            println!();
        }
    }

    Ok(())
}

/// Print clusters past their expiry, one section per cluster type
pub async fn list_expired(
    reconciler: &Reconciler,
    store: &dyn TagStore,
    today: NaiveDate,
    format: OutputFormat,
) -> Result<()> {
    const MODE: &str = "list-expired";
    let logger = reconciler.logger();
    logger.log_pass_started(MODE);

    let resources = reconciler.list_snapshot(store).await?;
    let inventory = reconciler.classify(&resources);
    let expired = reconciler.find_expired(&inventory, today);
    logger.log_pass_finished(MODE, expired.total());

    match format {
        OutputFormat::Json => print_json(&ExpiredListing {
            provider: store.provider(),
            scope: reconciler.scope(),
            as_of: scrubber_lib::expiry::format_date(today),
            expired: expired
                .iter()
                .map(|(cluster_type, clusters)| ExpiredSection {
                    cluster_type,
                    clusters,
                })
                .collect(),
        })?,
        OutputFormat::Table => {
            print_heading(&format!(
                "Expired clusters in {} ({})",
                reconciler.scope(),
                store.provider()
            ));
            for (cluster_type, clusters) in expired.iter() {
                println!(
                    "{} {}",
                    cluster_type.label().bold(),
                    format!("({})", clusters.len()).dimmed()
                );
                let rows: Vec<ClusterRow> =
                    clusters.iter().map(|g| ClusterRow::new(g, today)).collect();
                print_table(&rows, "None");
                println!();
            }
        }
    }

    Ok(())
}
