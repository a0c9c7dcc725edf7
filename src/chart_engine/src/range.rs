//! Probe range estimation.
//!
//! Upstream pagination is slow and rate-limited, so one generous request is
//! preferred over iterative refetching. The window asks for twice the bars
//! needed, converts that span to trading days of 960 minutes (16 hours of
//! pre, regular and post market) and pads three calendar days for weekends.

use std::num::NonZeroU32;

use chrono::{DateTime, Duration, Utc};

use crate::{
    request::Direction,
    session::SessionCalendar,
    timeframe::TimeframeUnit,
    tz::TimeConversionError,
};

pub const TRADING_DAY_MINUTES: u64 = 960;
pub const WEEKEND_PADDING_DAYS: u64 = 3;
pub const OVERFETCH_FACTOR: f64 = 2.0;

/// Millisecond window handed to the raw-bar provider, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Calendar days to probe for `bar_count` bars of `multiplier × unit`.
pub fn probe_days(
    unit: TimeframeUnit,
    multiplier: NonZeroU32,
    bar_count: usize,
) -> Result<u64, TimeConversionError> {
    let unit_secs = unit.duration().num_seconds() as u64;
    let bars = (bar_count as f64 * OVERFETCH_FACTOR).ceil() as u64;

    let total_secs = unit_secs
        .checked_mul(u64::from(multiplier.get()))
        .and_then(|bar_secs| bar_secs.checked_mul(bars))
        .ok_or(TimeConversionError::Overflow)?;

    Ok(total_secs.div_ceil(TRADING_DAY_MINUTES * 60) + WEEKEND_PADDING_DAYS)
}

/// Estimates the provider window for the next `bar_count` bars between
/// `lower` and `upper`.
///
/// Backward probes end at `upper` and start at local midnight of the
/// estimated day, never before `lower`. Forward probes start at `lower` and
/// end at the estimate, never after `upper`.
pub fn estimate_probe_range(
    direction: Direction,
    unit: TimeframeUnit,
    multiplier: NonZeroU32,
    bar_count: usize,
    lower: DateTime<Utc>,
    upper: DateTime<Utc>,
    calendar: &SessionCalendar,
) -> Result<ProbeRange, TimeConversionError> {
    let days = probe_days(unit, multiplier, bar_count)?;
    // Past chrono's range the estimate is unbounded anyway.
    let span = i64::try_from(days).ok().and_then(Duration::try_days);

    let (start, end) = match direction {
        Direction::Backward => {
            let start = match span.and_then(|s| upper.checked_sub_signed(s)) {
                Some(estimate) => calendar.local_midnight(estimate)?.max(lower),
                None => lower,
            };
            (start, upper)
        }
        Direction::Forward => {
            let end = span
                .and_then(|s| lower.checked_add_signed(s))
                .map_or(upper, |estimate| estimate.min(upper));
            (lower, end)
        }
    };

    Ok(ProbeRange {
        start_ms: start.timestamp_millis(),
        end_ms: end.timestamp_millis(),
    })
}
