//! Timestamp parsing and whole-second durations

use chrono::{DateTime, FixedOffset, ParseResult};

/// Parse an RFC3339 timestamp such as `2024-01-01T00:05:30.123Z`
pub fn parse_timestamp(value: &str) -> ParseResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
}

/// Seconds from `start` to `end`, rounded half away from zero.
///
/// Negative when `end` precedes `start`.
pub fn rounded_seconds_between(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> i64 {
    let delta = end.signed_duration_since(*start);
    let seconds = match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 1e9,
        // Beyond ~292 years nanoseconds overflow; millisecond precision is plenty there
        None => delta.num_milliseconds() as f64 / 1e3,
    };
    seconds.round() as i64
}
