//! Timestamp helpers.
//!
//! Comment timestamps are stored as integer microseconds since the Unix
//! epoch. Every timestamp the system hands out is truncated to that
//! precision first, so a value read back from storage compares equal to
//! the value that was written.

use chrono::{DateTime, Utc};

/// Current time truncated to microsecond precision.
pub fn now() -> DateTime<Utc> {
    truncate(Utc::now())
}

/// Drop sub-microsecond precision from a timestamp.
pub fn truncate(at: DateTime<Utc>) -> DateTime<Utc> {
    from_micros(at.timestamp_micros()).unwrap_or(at)
}

pub fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// Returns `None` when the value is outside chrono's representable range.
pub fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_drops_nanoseconds() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let truncated = truncate(at);
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_456_000);
    }

    #[test]
    fn test_micros_round_trip_is_stable() {
        let at = now();
        assert_eq!(from_micros(to_micros(at)), Some(at));
    }
}
