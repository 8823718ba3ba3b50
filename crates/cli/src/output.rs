//! Output formatting utilities

use chrono::NaiveDate;
use clap::ValueEnum;
use colored::Colorize;
use scrubber_lib::expiry::{format_date, is_expired, parse_date};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table of rows, or a notice when there are none
pub fn print_table<T: Tabled>(items: &[T], empty_message: &str) {
    if items.is_empty() {
        println!("{}", empty_message.yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color an expiry marker relative to `today`
pub fn color_expiry(marker: Option<&str>, today: NaiveDate) -> String {
    match marker {
        None => "unmarked".dimmed().to_string(),
        Some(marker) if parse_date(marker).is_err() => marker.magenta().to_string(),
        Some(marker) if is_expired(marker, today) => marker.red().to_string(),
        Some(marker) if marker == format_date(today) => marker.yellow().to_string(),
        Some(marker) => marker.green().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_expiry_keeps_marker_text() {
        colored::control::set_override(false);
        let today = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap();

        assert_eq!(color_expiry(None, today), "unmarked");
        assert_eq!(color_expiry(Some("2023-01-04"), today), "2023-01-04");
        assert_eq!(color_expiry(Some("2023-01-05"), today), "2023-01-05");
        assert_eq!(color_expiry(Some("garbage"), today), "garbage");
    }
}
