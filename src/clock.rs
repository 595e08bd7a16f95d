//! Time source used to stamp listings
//!
//! All timestamps handled by the server are truncated to millisecond
//! precision, which is what mobile clients send and what the store persists.
//! Comparisons between client-declared and stored timestamps therefore never
//! differ by sub-millisecond noise.

use chrono::{DateTime, Datelike, SecondsFormat, SubsecRound, Utc};

/// Supplies the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        normalize(Utc::now())
    }
}

/// Truncate a timestamp to millisecond precision
pub fn normalize(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

/// Whether the timestamp has a four-digit year
///
/// Only those round-trip through `format` and `parse` and sort correctly as
/// text.
pub fn is_storable(ts: DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// Canonical text form used for storage and ordering
pub fn format(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp into a normalized UTC value
pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| normalize(dt.with_timezone(&Utc)))
}

#[cfg(test)]
pub use manual::ManualClock;
