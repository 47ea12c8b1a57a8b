//! Wire format of the timestamp payload exchanged with the chat server.
//!
//! A payload is one or more newline-separated entries, each rendered as
//! `2026-10-19 08:15:42.123456789 +0000 UTC`. The zone abbreviation is only
//! informational; the numeric offset is what parsing relies on.
use chrono::{DateTime, FixedOffset, Utc};

use crate::error::TimestampError;

/// Layout used when writing a timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z %Z";
/// Layout used when reading a timestamp once the zone abbreviation is split off.
const PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";
/// Separator between entries of a single payload.
pub const ENTRY_SEPARATOR: char = '\n';

#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses one payload entry.
///
/// # Errors
///
/// Returns an error when the entry has no zone abbreviation or does not match
/// the timestamp layout.
pub fn parse_timestamp(entry: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    let trimmed = entry.trim_end_matches('\r');
    let (head, _zone) = trimmed
        .rsplit_once(' ')
        .ok_or_else(|| TimestampError::MissingZone {
            value: entry.to_owned(),
        })?;
    DateTime::parse_from_str(head, PARSE_FORMAT).map_err(|source| TimestampError::Parse {
        value: entry.to_owned(),
        source,
    })
}

/// Splits a payload into its entries.
pub fn split_entries(payload: &str) -> std::str::Split<'_, char> {
    payload.split(ENTRY_SEPARATOR)
}

/// Signed delay between a parsed timestamp and `now`, saturating on overflow.
#[must_use]
pub fn delay_nanos(sent_at: DateTime<FixedOffset>, now: DateTime<Utc>) -> i64 {
    let delay = now.signed_duration_since(sent_at);
    delay.num_nanoseconds().unwrap_or(if delay < chrono::TimeDelta::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}
