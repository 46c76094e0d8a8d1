//! Task timestamp parsing and canonical storage format.
//!
//! # Responsibility
//! - Accept user-facing date inputs (RFC 3339 or naive local wall-clock).
//! - Render the canonical persisted form used by the `tasks.date` column.
//! - Compute local-day boundaries for "today" style queries.
//!
//! # Invariants
//! - Canonical form is UTC with millisecond precision and a `Z` suffix, so
//!   lexical order equals chronological order.
//! - Naive inputs are interpreted in the local timezone; ambiguous local
//!   times resolve to the earliest instant.
//! - Day bounds always exist for a valid date: when a DST gap swallows
//!   midnight (or the end of the day) the first (or last) local instant the
//!   day actually has is used.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// `strftime` pattern of the canonical persisted timestamp.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const MINUTES_PER_DAY: i64 = 24 * 60;

const NAIVE_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses one task date input into an absolute instant.
///
/// Returns `None` for empty or unparsable text.
pub fn parse_task_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .and_then(local_naive_to_utc)
}

/// Renders an instant in canonical persisted form.
pub fn format_task_date(value: DateTime<Utc>) -> String {
    value.format(CANONICAL_DATE_FORMAT).to_string()
}

/// Parses and re-renders a date input in canonical form.
pub fn normalize_task_date(value: &str) -> Option<String> {
    parse_task_date(value).map(format_task_date)
}

/// Returns the inclusive `[00:00:00.000, 23:59:59.999]` bounds of one local
/// calendar day as UTC instants.
pub fn local_day_bounds(day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    day_bounds_in(day, |naive| {
        Local
            .from_local_datetime(&naive)
            .map(|local| local.with_timezone(&Utc))
    })
}

fn day_bounds_in(
    day: NaiveDate,
    resolve: impl Fn(NaiveDateTime) -> LocalResult<DateTime<Utc>>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let midnight = day.and_hms_opt(0, 0, 0)?;
    let last = day.and_hms_milli_opt(23, 59, 59, 999)?;
    let start = (0..MINUTES_PER_DAY)
        .map(|minute| midnight + Duration::minutes(minute))
        .find_map(|naive| resolve(naive).earliest())?;
    let end = (0..MINUTES_PER_DAY)
        .map(|minute| last - Duration::minutes(minute))
        .find_map(|naive| resolve(naive).latest())?;
    Some((start, end))
}

/// Returns the current instant in canonical persisted form.
pub fn now_canonical() -> String {
    format_task_date(Utc::now())
}

fn local_naive_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
