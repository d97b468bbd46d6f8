//! Source date handling.
//!
//! Source extracts carry dates in three known shapes. Only the date
//! portion of a value (the first whitespace-separated token) is parsed;
//! anything after it is ignored. Formats are tried in priority order:
//! ISO first, then day-first with hyphens, then day-first with slashes.

use chrono::{Datelike, NaiveDate};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

/// A date parsed from a source value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl SourceDate {
    /// Zero-padded `YYYY-MM-DD`.
    pub fn date_string(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }

    /// Normalized datetime form: `YYYY-MM-DD 00:00:00`.
    pub fn datetime_string(&self) -> String {
        format!("{} 00:00:00", self.date_string())
    }
}

/// Parse the date portion of a raw source value, or `None` when no format
/// matches.
pub fn parse_source_date(raw: &str) -> Option<SourceDate> {
    let token = raw.trim().split_whitespace().next()?;
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(token, format) {
            return Some(SourceDate {
                year: date.year(),
                month: date.month(),
                day: date.day(),
            });
        }
    }
    None
}

/// Normalize a raw source date to `YYYY-MM-DD 00:00:00`, or `None` when it
/// matches no known format.
pub fn normalize_datetime(raw: &str) -> Option<String> {
    parse_source_date(raw).map(|date| date.datetime_string())
}
