//! Expiry date policy
//!
//! Markers are stored as fixed-width `YYYY-MM-DD` strings. Because every
//! marker has a four-digit, zero-padded year, byte-wise string order equals
//! calendar order, so expiry checks compare strings directly. Any change of
//! format must keep that property or switch to parsed comparison.

use crate::error::{Result, ScrubError};
use chrono::{Datelike, Days, NaiveDate, Utc};

/// Marker date format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default offset used when a resource is first marked
pub const DEFAULT_EXPIRY_DAYS: i64 = 3;

const MAX_YEAR: i32 = 9999;

/// Today's date in UTC
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Format a date as a marker value
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a marker value, accepting only zero-padded `YYYY-MM-DD`
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let bytes = value.as_bytes();
    let well_shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !well_shaped {
        return Err(ScrubError::MalformedDate {
            value: value.to_string(),
        });
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ScrubError::MalformedDate {
        value: value.to_string(),
    })
}

/// Shift a date by `offset_days` and format it as a marker value
pub fn shift_date(date: NaiveDate, offset_days: i64) -> Result<String> {
    let magnitude = Days::new(offset_days.unsigned_abs());
    let shifted = if offset_days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };

    match shifted {
        Some(d) if (1..=MAX_YEAR).contains(&d.year()) => Ok(format_date(d)),
        _ => Err(ScrubError::DateOutOfRange {
            value: format_date(date),
            offset_days,
        }),
    }
}

/// Compute `reference + offset_days` as a marker value
pub fn compute_expiry(reference: &str, offset_days: i64) -> Result<String> {
    let date = parse_date(reference)?;
    shift_date(date, offset_days)
}

/// True iff `now` is strictly after the marker date
pub fn is_expired(marker: &str, now: NaiveDate) -> bool {
    format_date(now).as_str() > marker
}
