//! Regular trading session boundaries.
//!
//! The calendar is a value, not process-wide state: the orchestrator and the
//! aggregator both take a [`SessionCalendar`] explicitly. The default is the
//! US equity session, 09:30–16:00 America/New_York.
//!
//! Every calendar day gets the same session, weekends and market holidays
//! included. Callers that need holiday awareness filter elsewhere.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::tz::{DstPolicy, TimeConversionError, from_local_naive};

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::New_York;

const DEFAULT_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 30, 0) {
    Some(t) => t,
    None => unreachable!(),
};

const DEFAULT_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(16, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("session open {open} must be before close {close}")]
pub struct SessionError {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCalendar {
    timezone: Tz,
    open: NaiveTime,
    close: NaiveTime,
}

impl Default for SessionCalendar {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            open: DEFAULT_OPEN,
            close: DEFAULT_CLOSE,
        }
    }
}

impl SessionCalendar {
    pub fn new(timezone: Tz, open: NaiveTime, close: NaiveTime) -> Result<Self, SessionError> {
        if open >= close {
            return Err(SessionError { open, close });
        }
        Ok(Self {
            timezone,
            open,
            close,
        })
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Open and close instants of the session on the local calendar day that
    /// contains `instant`.
    pub fn regular_session_bounds(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), TimeConversionError> {
        let day = instant.with_timezone(&self.timezone).date_naive();
        let open = from_local_naive(day.and_time(self.open), self.timezone, DstPolicy::Lenient)?;
        let close = from_local_naive(day.and_time(self.close), self.timezone, DstPolicy::Lenient)?;
        Ok((open, close))
    }

    /// `instant` falls in `[open, close)` of its own local day.
    pub fn is_regular_hours(&self, instant: DateTime<Utc>) -> bool {
        self.regular_session_bounds(instant)
            .map(|(open, close)| open <= instant && instant < close)
            .unwrap_or(false)
    }

    /// Whether a bar stamped `instant` survives session filtering.
    pub fn admits(&self, instant: DateTime<Utc>, include_extended_hours: bool) -> bool {
        include_extended_hours || self.is_regular_hours(instant)
    }

    /// Local midnight starting the calendar day that contains `instant`.
    pub fn local_midnight(&self, instant: DateTime<Utc>) -> Result<DateTime<Utc>, TimeConversionError> {
        let day = instant.with_timezone(&self.timezone).date_naive();
        from_local_naive(day.and_time(NaiveTime::MIN), self.timezone, DstPolicy::Lenient)
    }
}
