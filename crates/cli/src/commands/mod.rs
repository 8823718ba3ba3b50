//! Scrubber CLI commands

pub mod extend;
pub mod report;
pub mod tag;

use anyhow::Result;
use colored::Colorize;
use scrubber_lib::{Provider, WriteReport};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_json, print_success, print_table, print_warning, OutputFormat};

/// How one scope pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every attempted write succeeded
    Clean,
    /// At least one marker write was rejected
    PartialFailure,
    /// Extend target not found in this scope
    NoMatch,
}

impl PassOutcome {
    pub fn from_report(report: &WriteReport) -> Self {
        if report.is_clean() {
            PassOutcome::Clean
        } else {
            PassOutcome::PartialFailure
        }
    }
}

/// Write report tagged with where it ran
#[derive(Serialize)]
struct ScopedReport<'a> {
    provider: Provider,
    scope: &'a str,
    #[serde(flatten)]
    report: &'a WriteReport,
}

/// Row for the marker write table
#[derive(Tabled)]
struct MarkerRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Render the outcome of a batch of marker writes
pub(crate) fn print_write_report(
    provider: Provider,
    scope: &str,
    report: &WriteReport,
    format: OutputFormat,
) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(&ScopedReport {
            provider,
            scope,
            report,
        });
    }

    let rows: Vec<MarkerRow> = report
        .written
        .iter()
        .map(|w| MarkerRow {
            resource: w.resource_id.clone(),
            status: "written".green().to_string(),
            detail: w.expiry.clone(),
        })
        .chain(report.skipped.iter().map(|s| MarkerRow {
            resource: s.resource_id.clone(),
            status: "skipped".yellow().to_string(),
            detail: s.reason.clone(),
        }))
        .chain(report.failed.iter().map(|f| MarkerRow {
            resource: f.resource_id.clone(),
            status: "failed".red().to_string(),
            detail: f.error.clone(),
        }))
        .collect();

    print_table(&rows, &format!("No markers to write in {scope}"));

    if report.failed.is_empty() {
        if !report.written.is_empty() {
            print_success(&format!(
                "Wrote {} marker(s) in {}",
                report.written.len(),
                scope
            ));
        }
    } else {
        print_warning(&format!(
            "{} of {} marker write(s) failed in {}",
            report.failed.len(),
            report.failed.len() + report.written.len(),
            scope
        ));
    }

    Ok(())
}
