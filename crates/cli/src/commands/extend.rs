//! Expiry extension for a single cluster

use anyhow::Result;
use chrono::NaiveDate;
use scrubber_lib::{Reconciler, ScrubError, TagStore};

use super::{print_write_report, PassOutcome};
use crate::output::{print_info, OutputFormat};

const MODE: &str = "extend";

/// Push `target`'s expiry to `today + days` on all of its members.
///
/// A target missing from this scope is not an error; the caller decides
/// whether it was missing everywhere.
pub async fn extend_cluster(
    reconciler: &Reconciler,
    store: &dyn TagStore,
    target: &str,
    days: i64,
    today: NaiveDate,
    format: OutputFormat,
) -> Result<PassOutcome> {
    let logger = reconciler.logger();
    logger.log_pass_started(MODE);

    let resources = reconciler.list_snapshot(store).await?;
    let inventory = reconciler.classify(&resources);

    let report = match reconciler
        .extend_one(store, &inventory, target, days, today)
        .await
    {
        Ok(report) => report,
        Err(ScrubError::NoMatch { .. }) => {
            logger.log_pass_finished(MODE, 0);
            if let OutputFormat::Table = format {
                print_info(&format!(
                    "No marked cluster named {} in {}",
                    target,
                    reconciler.scope()
                ));
            }
            return Ok(PassOutcome::NoMatch);
        }
        Err(e) => return Err(e.into()),
    };

    logger.log_pass_finished(MODE, report.written.len());
    print_write_report(store.provider(), reconciler.scope(), &report, format)?;

    Ok(PassOutcome::from_report(&report))
}
