//! Bar granularity as understood by upstream vendors.
//!
//! A [`TimeFrame`] is what gets put on the wire: an amount paired with a
//! [`TimeFrameUnit`]. Validation of which combinations a vendor accepts lives
//! with each provider, not here.

use std::num::NonZeroU32;

use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFrameUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeFrameUnit {
    /// Lowercase vendor spelling, e.g. `"minute"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            TimeFrameUnit::Second => "second",
            TimeFrameUnit::Minute => "minute",
            TimeFrameUnit::Hour => "hour",
            TimeFrameUnit::Day => "day",
            TimeFrameUnit::Week => "week",
            TimeFrameUnit::Month => "month",
            TimeFrameUnit::Year => "year",
        }
    }

    /// Nominal length of one unit. Months and years are approximated as
    /// 30 and 365 days.
    pub fn nominal_duration(self) -> Duration {
        match self {
            TimeFrameUnit::Second => Duration::seconds(1),
            TimeFrameUnit::Minute => Duration::minutes(1),
            TimeFrameUnit::Hour => Duration::hours(1),
            TimeFrameUnit::Day => Duration::days(1),
            TimeFrameUnit::Week => Duration::weeks(1),
            TimeFrameUnit::Month => Duration::days(30),
            TimeFrameUnit::Year => Duration::days(365),
        }
    }
}

/// amount × unit, e.g. 30-Minute or 1-Day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeFrame {
    pub amount: NonZeroU32,
    pub unit: TimeFrameUnit,
}

impl TimeFrame {
    pub const fn new(amount: NonZeroU32, unit: TimeFrameUnit) -> Self {
        Self { amount, unit }
    }

    /// Nominal width of one bar at this granularity, or `None` when it does
    /// not fit in a [`Duration`].
    pub fn nominal_duration(&self) -> Option<Duration> {
        self.unit
            .nominal_duration()
            .num_seconds()
            .checked_mul(i64::from(self.amount.get()))
            .and_then(Duration::try_seconds)
    }
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;

    use super::*;

    #[test]
    fn nominal_duration_scales_with_amount() {
        let tf = TimeFrame::new(nonzero!(30u32), TimeFrameUnit::Minute);
        assert_eq!(tf.nominal_duration(), Some(Duration::minutes(30)));

        let tf = TimeFrame::new(nonzero!(2u32), TimeFrameUnit::Week);
        assert_eq!(tf.nominal_duration(), Some(Duration::days(14)));
    }

    #[test]
    fn huge_amounts_do_not_wrap() {
        let tf = TimeFrame::new(nonzero!(3_000_000_000u32), TimeFrameUnit::Minute);
        assert_eq!(tf.nominal_duration(), Some(Duration::minutes(3_000_000_000)));

        let tf = TimeFrame::new(nonzero!(3_000_000_000u32), TimeFrameUnit::Year);
        assert_eq!(tf.nominal_duration(), None);
    }

    #[test]
    fn units_serialize_snake_case() {
        let json = serde_json::to_string(&TimeFrameUnit::Minute).unwrap();
        assert_eq!(json, "\"minute\"");
        assert_eq!(TimeFrameUnit::Year.as_str(), "year");
    }
}
