//! Time zone parsing and conversion helpers.
//!
//! What this module provides:
//! - [`parse_ts_to_utc`]: parse RFC-3339 timestamps with an explicit offset into UTC.
//! - [`to_rfc3339_millis`]: the one canonical text form used for stored dates.
//! - [`from_epoch_millis`]: checked conversion from epoch milliseconds.
//! - [`from_local_naive`]: resolve a wall-clock time in an IANA zone to UTC under a
//!   [`DstPolicy`].
//!
//! Notes:
//! - Ambiguous local times happen during "fall back" when a wall time occurs twice.
//! - Nonexistent local times happen during "spring forward" when a wall time is skipped.
//! - Stored dates are RFC-3339 UTC strings with millisecond precision, so
//!   lexical order equals chronological order.
//!
//! Examples
//! - RFC-3339 with offset to UTC:
//!   "2024-03-10T09:30:00-05:00" -> "2024-03-10T14:30:00Z"
//! - New York "fall back" ambiguity (2024-11-03 01:30 occurs twice):
//!   Lenient -> 05:30Z (the earlier instant).

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeConversionError {
    #[error("bad rfc3339 timestamp: {0}")]
    BadRfc3339(String),

    #[error("epoch milliseconds {0} out of range")]
    MillisOutOfRange(i64),

    #[error("ambiguous local time {naive} in {tz}")]
    Ambiguous { naive: NaiveDateTime, tz: Tz },

    #[error("nonexistent local time {naive} in {tz}")]
    Nonexistent { naive: NaiveDateTime, tz: Tz },

    #[error("date arithmetic overflow")]
    Overflow,
}

/// Policy for handling DST edge cases when resolving local wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstPolicy {
    /// Error on ambiguous (fall-back) or nonexistent (spring-forward) local times.
    Strict,
    /// Ambiguous times take the earlier instant; nonexistent times shift forward
    /// minute by minute until valid (capped at 2 hours).
    Lenient,
}

/// RFC-3339 with offset -> UTC.
pub fn parse_ts_to_utc(s: &str) -> Result<DateTime<Utc>, TimeConversionError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimeConversionError::BadRfc3339(s.to_string()))
}

/// Format a UTC datetime as an RFC-3339 string with millisecond precision.
pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn from_epoch_millis(ms: i64) -> Result<DateTime<Utc>, TimeConversionError> {
    DateTime::from_timestamp_millis(ms).ok_or(TimeConversionError::MillisOutOfRange(ms))
}

/// Convert a naive local timestamp in `tz` to UTC.
pub fn from_local_naive(
    naive: NaiveDateTime,
    tz: Tz,
    policy: DstPolicy,
) -> Result<DateTime<Utc>, TimeConversionError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => match policy {
            DstPolicy::Lenient => Ok(earliest.with_timezone(&Utc)),
            DstPolicy::Strict => Err(TimeConversionError::Ambiguous { naive, tz }),
        },
        LocalResult::None => match policy {
            DstPolicy::Lenient => {
                let mut t = naive;
                for _ in 0..120 {
                    t += Duration::minutes(1);
                    if let LocalResult::Single(dt) = tz.from_local_datetime(&t) {
                        return Ok(dt.with_timezone(&Utc));
                    }
                }
                Err(TimeConversionError::Nonexistent { naive, tz })
            }
            DstPolicy::Strict => Err(TimeConversionError::Nonexistent { naive, tz }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::America::New_York;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parse_rfc3339_offset_to_utc() {
        let got = parse_ts_to_utc("2024-03-10T09:30:00-05:00").expect("parse");
        let want = Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap();
        assert_eq!(got, want);
        assert!(parse_ts_to_utc("yesterday").is_err());
    }

    #[test]
    fn millis_text_sorts_chronologically() {
        let a = to_rfc3339_millis(Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap());
        let b = to_rfc3339_millis(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(a, "2020-06-01T00:00:00.000Z");
        assert!(a < b);
    }

    #[test]
    fn epoch_millis_round_trip_and_overflow() {
        let t = from_epoch_millis(1_704_205_800_000).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap());
        assert_eq!(
            from_epoch_millis(i64::MAX),
            Err(TimeConversionError::MillisOutOfRange(i64::MAX))
        );
    }

    #[test]
    fn spring_forward_gap() {
        // 02:30 does not exist on 2024-03-10 in New York.
        let n = naive(2024, 3, 10, 2, 30);
        assert!(from_local_naive(n, New_York, DstPolicy::Strict).is_err());
        let got = from_local_naive(n, New_York, DstPolicy::Lenient).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap());
    }

    #[test]
    fn fall_back_ambiguity() {
        // 01:30 occurs twice on 2024-11-03; the EDT reading comes first.
        let n = naive(2024, 11, 3, 1, 30);
        assert!(from_local_naive(n, New_York, DstPolicy::Strict).is_err());
        let got = from_local_naive(n, New_York, DstPolicy::Lenient).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }

    #[test]
    fn winter_and_summer_offsets() {
        let est = from_local_naive(naive(2024, 1, 15, 9, 30), New_York, DstPolicy::Strict).unwrap();
        assert_eq!(est, Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap());
        let edt = from_local_naive(naive(2024, 7, 15, 9, 30), New_York, DstPolicy::Strict).unwrap();
        assert_eq!(edt, Utc.with_ymd_and_hms(2024, 7, 15, 13, 30, 0).unwrap());
    }
}
