//! Lenient date and time parsing for capture-system exports.
//!
//! Exports mix ISO dates, slashed dates, and month-name dates, with or
//! without a time component. Values that match none of the accepted forms
//! parse to `None`; callers decide whether that is worth reporting.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// `H:MM`, `HH:MM`, `HH:MM:SS`, or `HHMM`, with optional fractional seconds.
static TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):?([0-5]\d)(?::([0-5]\d)(?:\.\d+)?)?$").expect("Invalid time regex")
});

/// A parsed date cell, remembering whether it carried a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl ParsedDate {
    pub fn date(&self) -> NaiveDate {
        match self {
            ParsedDate::Date(date) => *date,
            ParsedDate::DateTime(datetime) => datetime.date(),
        }
    }

    /// The embedded timestamp when it is not midnight.
    pub fn explicit_time(&self) -> Option<NaiveDateTime> {
        match self {
            ParsedDate::DateTime(datetime) if datetime.time() != NaiveTime::MIN => Some(*datetime),
            _ => None,
        }
    }

    /// Combine with a time of day unless the value already carries one.
    pub fn at(&self, time: Option<NaiveTime>) -> NaiveDateTime {
        self.explicit_time()
            .unwrap_or_else(|| self.date().and_time(time.unwrap_or(NaiveTime::MIN)))
    }
}

/// Parse a date cell in any accepted form.
pub fn parse_date_cell(value: &str) -> Option<ParsedDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(datetime) = try_parse_datetime(trimmed) {
        return Some(ParsedDate::DateTime(datetime));
    }
    try_parse_date(trimmed).map(ParsedDate::Date)
}

/// Parse a time-of-day cell.
pub fn parse_time_cell(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    let captures = TIME_REGEX.captures(trimmed)?;
    let hour: u32 = captures.get(1)?.as_str().parse().ok()?;
    let minute: u32 = captures.get(2)?.as_str().parse().ok()?;
    let second: u32 = match captures.get(3) {
        Some(second) => second.as_str().parse().ok()?,
        None => 0,
    };
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn try_parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%d-%b-%Y %H:%M:%S", // 15-Jan-2024 10:30:00
        "%d-%b-%Y %H:%M",
        "%m/%d/%Y %H:%M:%S", // US
        "%m/%d/%Y %H:%M",
        "%d/%m/%Y %H:%M:%S", // European
        "%d/%m/%Y %H:%M",
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn try_parse_date(value: &str) -> Option<NaiveDate> {
    let formats = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d-%b-%Y", // 15-Jan-2024
        "%d-%B-%Y", // 15-January-2024
        "%m/%d/%Y", // US: 01/15/2024
        "%d/%m/%Y", // European: 15/01/2024
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}
