//! Cloud Scrubber CLI
//!
//! Classifies cloud resources into clusters, assigns expiry markers,
//! reports expired clusters and extends a single cluster's lease. One mode
//! runs per invocation, against one provider and one or more scopes.

mod commands;
mod config;
mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use commands::{extend, report, tag, PassOutcome};
use scrubber_lib::{expiry, InventoryStore, Provider, Reconciler};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Mutually exclusive run modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Write an initial expiry marker on every unmarked resource
    Tag,
    /// List clusters with their type, size and marker
    ListClusters,
    /// List clusters whose marker has passed
    ListExpired,
    /// Push one cluster's expiry forward
    Extend,
}

impl Mode {
    fn as_str(&self) -> &'static str {
        match self {
            Mode::Tag => "tag",
            Mode::ListClusters => "list-clusters",
            Mode::ListExpired => "list-expired",
            Mode::Extend => "extend",
        }
    }
}

/// Cloud Scrubber CLI
#[derive(Parser)]
#[command(name = "scrubber")]
#[command(author, version, about = "Cloud Scrubber: expiry tagging for cloud clusters", long_about = None)]
pub struct Cli {
    /// Operation to run
    #[arg(long, short, env = "SCRUBBER_MODE", value_enum)]
    pub mode: Mode,

    /// Cloud provider (aws, gcp, azure)
    #[arg(long, short, env = "SCRUBBER_PROVIDER")]
    pub provider: Provider,

    /// Regions, projects or subscriptions to scan (comma separated)
    #[arg(long, short, env = "SCRUBBER_SCOPE", value_delimiter = ',', required = true)]
    pub scope: Vec<String>,

    /// Cluster to extend (extend mode)
    #[arg(long, short, env = "SCRUBBER_CLUSTER")]
    pub cluster: Option<String>,

    /// Days to extend by, measured from today (extend mode)
    #[arg(long, env = "SCRUBBER_EXTEND_DAYS", value_parser = clap::value_parser!(i64).range(0..))]
    pub days: Option<i64>,

    /// Inventory file (overrides inventory_path from the configuration)
    #[arg(long, short)]
    pub inventory: Option<PathBuf>,

    /// Configuration file (defaults to ~/.config/scrubber/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if verbose {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = config::ScrubberConfig::load(cli.config.as_deref())?;

    let target = match (cli.mode, cli.cluster.as_deref()) {
        (Mode::Extend, None) => bail!("extend mode requires --cluster or SCRUBBER_CLUSTER"),
        (_, target) => target,
    };

    let inventory_path = cli.inventory.unwrap_or(settings.inventory_path.clone());
    let store = InventoryStore::open(&inventory_path, cli.provider)
        .await
        .with_context(|| format!("Failed to open inventory {}", inventory_path.display()))?;

    let classifier = settings.classifier_config(cli.provider);
    let today = expiry::today();
    let days = cli.days.unwrap_or(settings.extend_days);

    info!(
        mode = cli.mode.as_str(),
        provider = %cli.provider,
        scopes = cli.scope.len(),
        "Scrubber configured"
    );

    let mut failed_scopes = Vec::new();
    let mut extended = false;

    for scope in &cli.scope {
        let reconciler = Reconciler::new(classifier.clone(), scope.as_str());

        let result = match cli.mode {
            Mode::Tag => {
                tag::tag_unmarked(&reconciler, &store, today, settings.expiry_days, cli.format)
                    .await
            }
            Mode::ListClusters => report::list_clusters(&reconciler, &store, today, cli.format)
                .await
                .map(|_| PassOutcome::Clean),
            Mode::ListExpired => report::list_expired(&reconciler, &store, today, cli.format)
                .await
                .map(|_| PassOutcome::Clean),
            Mode::Extend => {
                let target = target.unwrap_or_default();
                extend::extend_cluster(&reconciler, &store, target, days, today, cli.format).await
            }
        };

        match result {
            Ok(PassOutcome::Clean) => extended |= cli.mode == Mode::Extend,
            Ok(PassOutcome::NoMatch) => {}
            Ok(PassOutcome::PartialFailure) => {
                extended |= cli.mode == Mode::Extend;
                failed_scopes.push(scope.clone());
            }
            Err(e) => {
                error!(scope = %scope, error = %e, "Scope pass failed");
                output::print_error(&format!("{scope}: {e:#}"));
                failed_scopes.push(scope.clone());
            }
        }
    }

    if let (Mode::Extend, Some(target), false) = (cli.mode, target, extended) {
        warn!(target = %target, "Extend target not found in any scope");
        output::print_warning(&format!("No marked cluster named {target} found, nothing extended"));
    }

    if !failed_scopes.is_empty() {
        bail!("{} scope(s) did not complete cleanly: {}", failed_scopes.len(), failed_scopes.join(", "));
    }

    Ok(())
}
