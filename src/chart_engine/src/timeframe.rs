//! Chart timeframes: the text a charting client sends (`"5"`, `"1h"`, `"1d"`).
//!
//! A [`Timeframe`] pairs a non-zero multiplier with a [`TimeframeUnit`].
//! Purely numeric text means minutes; anything else carries a one-character,
//! case-sensitive unit suffix:
//!
//! | suffix | unit   |
//! |--------|--------|
//! | (none) | minute |
//! | `s`    | second |
//! | `h`    | hour   |
//! | `d`    | day    |
//! | `w`    | week   |
//! | `m`    | month  |
//! | `y`    | year   |
//!
//! ```
//! use chart_engine::timeframe::{Timeframe, TimeframeUnit};
//!
//! let tf: Timeframe = "4h".parse().unwrap();
//! assert_eq!(tf.multiplier().get(), 4);
//! assert_eq!(tf.unit(), TimeframeUnit::Hour);
//! assert_eq!(tf.to_string(), "4h");
//! ```

use std::{fmt, num::NonZeroU32, str::FromStr};

use chrono::Duration;
use market_data_ingestor::models::timeframe::{TimeFrame, TimeFrameUnit};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeframeError {
    #[error("empty timeframe")]
    Empty,

    #[error("unknown timeframe unit {0:?}")]
    UnknownUnit(char),

    #[error("timeframe multiplier {0:?} is not a positive integer")]
    InvalidMultiplier(String),

    #[error("timeframe {0:?} is too wide to represent")]
    TooWide(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeframeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeframeUnit {
    /// Suffix used in timeframe text; minutes have none.
    pub const fn suffix(self) -> Option<char> {
        match self {
            TimeframeUnit::Second => Some('s'),
            TimeframeUnit::Minute => None,
            TimeframeUnit::Hour => Some('h'),
            TimeframeUnit::Day => Some('d'),
            TimeframeUnit::Week => Some('w'),
            TimeframeUnit::Month => Some('m'),
            TimeframeUnit::Year => Some('y'),
        }
    }

    fn from_suffix(c: char) -> Option<Self> {
        match c {
            's' => Some(TimeframeUnit::Second),
            'h' => Some(TimeframeUnit::Hour),
            'd' => Some(TimeframeUnit::Day),
            'w' => Some(TimeframeUnit::Week),
            'm' => Some(TimeframeUnit::Month),
            'y' => Some(TimeframeUnit::Year),
            _ => None,
        }
    }

    /// Day, week, month and year bars span whole sessions.
    pub const fn is_intraday(self) -> bool {
        matches!(
            self,
            TimeframeUnit::Second | TimeframeUnit::Minute | TimeframeUnit::Hour
        )
    }

    /// Length of one unit; one hour counts as 60 base minutes. Months and
    /// years are nominal (30 and 365 days).
    pub fn duration(self) -> Duration {
        self.provider_unit().nominal_duration()
    }

    pub const fn provider_unit(self) -> TimeFrameUnit {
        match self {
            TimeframeUnit::Second => TimeFrameUnit::Second,
            TimeframeUnit::Minute => TimeFrameUnit::Minute,
            TimeframeUnit::Hour => TimeFrameUnit::Hour,
            TimeframeUnit::Day => TimeFrameUnit::Day,
            TimeframeUnit::Week => TimeFrameUnit::Week,
            TimeframeUnit::Month => TimeFrameUnit::Month,
            TimeframeUnit::Year => TimeFrameUnit::Year,
        }
    }
}

/// A timeframe = multiplier × unit (e.g., 5-Minute, 1-Hour, 3-Month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeframe {
    multiplier: NonZeroU32,
    unit: TimeframeUnit,
}

impl Timeframe {
    pub const fn new(multiplier: NonZeroU32, unit: TimeframeUnit) -> Self {
        Self { multiplier, unit }
    }

    pub const fn multiplier(&self) -> NonZeroU32 {
        self.multiplier
    }

    pub const fn unit(&self) -> TimeframeUnit {
        self.unit
    }

    /// Width of one bar (multiplier × unit length). Saturates at
    /// [`Duration::MAX`]; parsed timeframes always fit.
    pub fn duration(&self) -> Duration {
        self.to_provider().nominal_duration().unwrap_or(Duration::MAX)
    }

    /// The same granularity, as requested from a provider.
    pub const fn to_provider(self) -> TimeFrame {
        TimeFrame::new(self.multiplier, self.unit.provider_unit())
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit.suffix() {
            Some(s) => write!(f, "{}{s}", self.multiplier),
            None => write!(f, "{}", self.multiplier),
        }
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let last = s.chars().next_back().ok_or(TimeframeError::Empty)?;

        let (digits, unit) = if last.is_ascii_digit() {
            (s, TimeframeUnit::Minute)
        } else {
            let unit = TimeframeUnit::from_suffix(last).ok_or(TimeframeError::UnknownUnit(last))?;
            (&s[..s.len() - last.len_utf8()], unit)
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimeframeError::InvalidMultiplier(digits.to_string()));
        }
        let multiplier = digits
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| TimeframeError::InvalidMultiplier(digits.to_string()))?;

        let tf = Timeframe::new(multiplier, unit);
        if tf.to_provider().nominal_duration().is_none() {
            return Err(TimeframeError::TooWide(s.to_string()));
        }
        Ok(tf)
    }
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;
    use proptest::prelude::*;

    use super::*;

    const UNITS: [TimeframeUnit; 7] = [
        TimeframeUnit::Second,
        TimeframeUnit::Minute,
        TimeframeUnit::Hour,
        TimeframeUnit::Day,
        TimeframeUnit::Week,
        TimeframeUnit::Month,
        TimeframeUnit::Year,
    ];

    #[test]
    fn numeric_text_is_minutes() {
        let tf: Timeframe = "45".parse().unwrap();
        assert_eq!(tf, Timeframe::new(nonzero!(45u32), TimeframeUnit::Minute));
        assert_eq!(tf.duration(), Duration::minutes(45));
    }

    #[test]
    fn suffixes_map_to_units() {
        assert_eq!("30s".parse::<Timeframe>().unwrap().unit(), TimeframeUnit::Second);
        assert_eq!("1h".parse::<Timeframe>().unwrap().unit(), TimeframeUnit::Hour);
        assert_eq!("1d".parse::<Timeframe>().unwrap().unit(), TimeframeUnit::Day);
        assert_eq!("1w".parse::<Timeframe>().unwrap().unit(), TimeframeUnit::Week);
        assert_eq!("3m".parse::<Timeframe>().unwrap().unit(), TimeframeUnit::Month);
        assert_eq!("1y".parse::<Timeframe>().unwrap().unit(), TimeframeUnit::Year);
    }

    #[test]
    fn hour_is_sixty_minutes() {
        let tf: Timeframe = "2h".parse().unwrap();
        assert_eq!(tf.duration(), Duration::minutes(120));
    }

    #[test]
    fn suffixes_are_case_sensitive() {
        assert_eq!("1H".parse::<Timeframe>(), Err(TimeframeError::UnknownUnit('H')));
        assert_eq!("1D".parse::<Timeframe>(), Err(TimeframeError::UnknownUnit('D')));
        assert_eq!("1M".parse::<Timeframe>(), Err(TimeframeError::UnknownUnit('M')));
    }

    #[test]
    fn rejects_bad_multipliers() {
        assert_eq!("".parse::<Timeframe>(), Err(TimeframeError::Empty));
        assert!(matches!("h".parse::<Timeframe>(), Err(TimeframeError::InvalidMultiplier(_))));
        assert!(matches!("0".parse::<Timeframe>(), Err(TimeframeError::InvalidMultiplier(_))));
        assert!(matches!("0d".parse::<Timeframe>(), Err(TimeframeError::InvalidMultiplier(_))));
        assert!(matches!("-5".parse::<Timeframe>(), Err(TimeframeError::InvalidMultiplier(_))));
        assert!(matches!("+5".parse::<Timeframe>(), Err(TimeframeError::InvalidMultiplier(_))));
        assert!(matches!("1.5h".parse::<Timeframe>(), Err(TimeframeError::InvalidMultiplier(_))));
        assert!(matches!("99999999999".parse::<Timeframe>(), Err(TimeframeError::InvalidMultiplier(_))));
    }

    #[test]
    fn width_beyond_i32_multiples_does_not_wrap() {
        let tf: Timeframe = "3000000000".parse().unwrap();
        assert_eq!(tf.duration(), Duration::minutes(3_000_000_000));

        let tf: Timeframe = "3000000000h".parse().unwrap();
        assert_eq!(tf.duration(), Duration::hours(3_000_000_000));
        assert!(tf.duration() > Duration::zero());
    }

    #[test]
    fn rejects_unrepresentable_width() {
        assert_eq!(
            "3000000000y".parse::<Timeframe>(),
            Err(TimeframeError::TooWide("3000000000y".into()))
        );
        assert!(matches!("4294967295m".parse::<Timeframe>(), Err(TimeframeError::TooWide(_))));
        assert!("4294967295w".parse::<Timeframe>().is_ok());
    }

    #[test]
    fn daily_and_up_are_not_intraday() {
        assert!(TimeframeUnit::Hour.is_intraday());
        assert!(!TimeframeUnit::Day.is_intraday());
        assert!(!TimeframeUnit::Year.is_intraday());
    }

    proptest! {
        #[test]
        fn display_then_parse_is_identity(m in 1u32..100_000, idx in 0usize..UNITS.len()) {
            let tf = Timeframe::new(NonZeroU32::new(m).unwrap(), UNITS[idx]);
            prop_assert_eq!(tf.to_string().parse::<Timeframe>(), Ok(tf));
        }

        #[test]
        fn unsupported_suffixes_fail(m in 1u32..1000, c in "[a-zA-Z]") {
            let c = c.chars().next().unwrap();
            prop_assume!(!"shdwmy".contains(c));
            prop_assert_eq!(format!("{m}{c}").parse::<Timeframe>(), Err(TimeframeError::UnknownUnit(c)));
        }
    }
}
