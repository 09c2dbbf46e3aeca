//! Event window parsing.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Parse an event time given as RFC 3339 or as `HH:MM` on `date` (UTC).
pub fn parse_event_time(value: &str, date: NaiveDate) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }
    let clock = NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .with_context(|| format!("'{value}' is neither RFC 3339 nor HH:MM"))?;
    Ok(date.and_time(clock).and_utc())
}

/// Resolve the event end. A clock time earlier than the start rolls over to the next day.
pub fn parse_event_end(value: &str, date: NaiveDate, start: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let mut end = parse_event_time(value, date)?;
    if end <= start && DateTime::parse_from_rfc3339(value.trim()).is_err() {
        end += chrono::Duration::days(1);
    }
    if end <= start {
        bail!("event end {end} is not after start {start}");
    }
    Ok(end)
}
