//! Sequential re-bucketing of raw bars into wider consolidated bars.
//!
//! Buckets are anchored to the first admitted bar, not to a wall-clock grid:
//! a bucket opens on a bar and absorbs every following bar that starts less
//! than `bucket` after it. Two probes that begin at different raw bars can
//! therefore produce different boundaries for the same logical hour.
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use chart_engine::aggregate::{AggregationParams, BucketAggregator};
//! use chart_engine::request::Direction;
//! use chart_engine::session::SessionCalendar;
//! use market_data_ingestor::models::bar::Bar;
//!
//! let cal = SessionCalendar::default();
//! let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
//! let mut agg = BucketAggregator::new(
//!     &cal,
//!     AggregationParams {
//!         bucket: Duration::minutes(2),
//!         include_extended_hours: false,
//!         direction: Direction::Forward,
//!         bars_wanted: 10,
//!     },
//! );
//! for i in 0..4 {
//!     agg.push(Bar::new(t0 + Duration::minutes(i), 1.0, 2.0, 0.5, 1.5, 10.0));
//! }
//! let out = agg.finish();
//! assert_eq!(out.bars.len(), 2);
//! assert_eq!(out.bars[0].volume, 20.0);
//! ```

use chrono::Duration;
use market_data_ingestor::models::bar::Bar;
use thiserror::Error;

use crate::{request::Direction, session::SessionCalendar};

/// A bar built by folding raw bars; its timestamp is the start of the first
/// raw bar it absorbed.
pub type ConsolidatedBar = Bar;

#[derive(Debug, Error)]
#[error("bar source failed after {consumed} bars")]
pub struct AggregationError<E>
where
    E: std::error::Error + 'static,
{
    pub consumed: usize,
    #[source]
    pub source: E,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationParams {
    /// Width of one consolidated bar.
    pub bucket: Duration,
    pub include_extended_hours: bool,
    pub direction: Direction,
    /// How many consolidated bars the caller still needs.
    pub bars_wanted: usize,
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Consolidated bars in ascending time order.
    pub bars: Vec<ConsolidatedBar>,
    /// Bars the caller still needs after this pass.
    pub remaining: usize,
}

/// Streaming bucket fold over ascending raw bars.
///
/// Forward passes count buckets as they close and ignore input once enough
/// have been emitted. Backward passes keep every bucket and trim to the most
/// recent `bars_wanted` in [`finish`](Self::finish).
#[derive(Debug)]
pub struct BucketAggregator<'c> {
    calendar: &'c SessionCalendar,
    params: AggregationParams,
    current: Option<ConsolidatedBar>,
    emitted: Vec<ConsolidatedBar>,
    remaining: usize,
}

impl<'c> BucketAggregator<'c> {
    pub fn new(calendar: &'c SessionCalendar, params: AggregationParams) -> Self {
        Self {
            calendar,
            params,
            current: None,
            emitted: Vec::new(),
            remaining: params.bars_wanted,
        }
    }

    /// True once a forward pass has produced everything it was asked for.
    pub fn is_satisfied(&self) -> bool {
        self.params.direction == Direction::Forward && self.remaining == 0
    }

    pub fn push(&mut self, bar: Bar) {
        if self.is_satisfied() {
            return;
        }
        if !self.calendar.admits(bar.timestamp, self.params.include_extended_hours) {
            return;
        }

        match self.current.as_mut() {
            Some(cur) if bar.timestamp - cur.timestamp < self.params.bucket => {
                cur.high = cur.high.max(bar.high);
                cur.low = cur.low.min(bar.low);
                cur.close = bar.close;
                cur.volume += bar.volume;
            }
            _ => {
                self.flush();
                if !self.is_satisfied() {
                    self.current = Some(bar);
                }
            }
        }
    }

    /// Pushes a page of bars, ignoring the rest once satisfied.
    pub fn extend(&mut self, bars: impl IntoIterator<Item = Bar>) {
        for bar in bars {
            if self.is_satisfied() {
                break;
            }
            self.push(bar);
        }
    }

    fn flush(&mut self) {
        if let Some(done) = self.current.take() {
            self.emitted.push(done);
            if self.params.direction == Direction::Forward {
                self.remaining = self.remaining.saturating_sub(1);
            }
        }
    }

    /// Closes the open bucket and applies the direction's trimming rule.
    pub fn finish(mut self) -> Aggregation {
        self.flush();
        let mut bars = self.emitted;

        match self.params.direction {
            Direction::Forward => Aggregation {
                bars,
                remaining: self.remaining,
            },
            Direction::Backward => {
                let keep = self.params.bars_wanted;
                if bars.len() > keep {
                    bars.drain(..bars.len() - keep);
                }
                let remaining = keep - bars.len();
                Aggregation { bars, remaining }
            }
        }
    }
}

/// Folds a fallible, ascending bar sequence in one pass.
///
/// Iterator form of [`BucketAggregator`] for library callers that hold a
/// whole bar source; paged provider fetches drive the aggregator directly
/// through [`BucketAggregator::extend`]. The first error from `raw_bars`
/// aborts the pass; partial buckets are discarded.
pub fn aggregate<I, E>(
    raw_bars: I,
    calendar: &SessionCalendar,
    params: AggregationParams,
) -> Result<Aggregation, AggregationError<E>>
where
    I: IntoIterator<Item = Result<Bar, E>>,
    E: std::error::Error + 'static,
{
    let mut agg = BucketAggregator::new(calendar, params);
    for (consumed, item) in raw_bars.into_iter().enumerate() {
        let bar = item.map_err(|source| AggregationError { consumed, source })?;
        agg.push(bar);
        if agg.is_satisfied() {
            break;
        }
    }
    Ok(agg.finish())
}
