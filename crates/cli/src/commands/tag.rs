//! Initial marker assignment

use anyhow::Result;
use chrono::NaiveDate;
use scrubber_lib::{Reconciler, TagStore};

use super::{print_write_report, PassOutcome};
use crate::output::OutputFormat;

const MODE: &str = "tag";

/// Mark every unmarked resource in the reconciler's scope
pub async fn tag_unmarked(
    reconciler: &Reconciler,
    store: &dyn TagStore,
    today: NaiveDate,
    expiry_days: i64,
    format: OutputFormat,
) -> Result<PassOutcome> {
    let logger = reconciler.logger();
    logger.log_pass_started(MODE);

    let resources = reconciler.list_snapshot(store).await?;
    let report = reconciler
        .tag_unmarked(store, &resources, today, expiry_days)
        .await;

    logger.log_pass_finished(MODE, report.written.len());
    print_write_report(store.provider(), reconciler.scope(), &report, format)?;

    Ok(PassOutcome::from_report(&report))
}
