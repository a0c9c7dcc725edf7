//! Chart data orchestration.
//!
//! [`ChartService::get_chart_data`] turns a [`ChartRequest`] into exactly the
//! requested number of bars (or fewer, when history runs out):
//!
//! 1. parse the timeframe and pick a [`FetchPlan`];
//! 2. resolve the reference instant (`0` is now);
//! 3. walk the security's ticker history nearest-first, and for each ticker
//!    clamp its validity window, estimate a probe range, pull provider pages
//!    and either aggregate them or take them as they are;
//! 4. stop as soon as nothing is outstanding, then return the bars ascending.
//!
//! Each call is independent. Dropping the returned future cancels whatever
//! directory query or provider page is in flight.

use std::{num::NonZeroU32, time::Duration};

use chrono::{DateTime, Utc};
use market_data_ingestor::{
    models::{
        bar::Bar,
        request_params::{BarsRequestParams, MAX_PAGE_LIMIT, Sort},
        timeframe::TimeFrame,
    },
    providers::{BarPages, DataProvider},
};
use nonzero_ext::nonzero;
use tracing::{debug, error, info};

use crate::{
    aggregate::{AggregationParams, BucketAggregator},
    directory::SecurityDirectory,
    error::ChartError,
    history::{SecurityHistoryWalker, TickerSpan},
    range::estimate_probe_range,
    request::{ChartRequest, ChartResponse, Direction},
    session::SessionCalendar,
    timeframe::{Timeframe, TimeframeUnit},
    tz,
};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSettings {
    /// Deadline for the ticker-history lookup.
    pub query_timeout: Duration,
    /// Page size asked of the provider, capped at [`MAX_PAGE_LIMIT`].
    pub page_limit: u32,
    /// Deadline for each provider page.
    pub page_timeout: Duration,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            page_limit: MAX_PAGE_LIMIT,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
        }
    }
}

/// How a timeframe is served from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    /// Granularity requested upstream.
    pub base: TimeFrame,
    /// Bucket width when base bars must be re-aggregated.
    pub bucket: Option<chrono::Duration>,
    /// Whether bars outside the regular session are dropped.
    pub regular_hours_only: bool,
}

impl FetchPlan {
    pub fn new(timeframe: Timeframe, include_extended_hours: bool) -> Self {
        let unit = timeframe.unit();
        let multiplier = timeframe.multiplier();
        let regular_hours_only = unit.is_intraday() && !include_extended_hours;

        let (base, bucket) = match unit {
            TimeframeUnit::Second | TimeframeUnit::Minute => {
                if max_divisor_of_30(multiplier) == multiplier {
                    (timeframe.to_provider(), None)
                } else {
                    let base = TimeFrame::new(nonzero!(1u32), unit.provider_unit());
                    (base, Some(timeframe.duration()))
                }
            }
            TimeframeUnit::Hour if !include_extended_hours => {
                let base = TimeFrame::new(nonzero!(30u32), TimeframeUnit::Minute.provider_unit());
                (base, Some(timeframe.duration()))
            }
            _ => (timeframe.to_provider(), None),
        };

        Self {
            base,
            bucket,
            regular_hours_only,
        }
    }

    pub fn is_aggregated(&self) -> bool {
        self.bucket.is_some()
    }

    /// Aggregation needs ascending input; plain backward reads go newest
    /// first so they can stop early.
    pub fn sort(&self, direction: Direction) -> Sort {
        match (self.is_aggregated(), direction) {
            (false, Direction::Backward) => Sort::Desc,
            _ => Sort::Asc,
        }
    }
}

/// The native base granularity for a second or minute multiple: the
/// multiplier itself when it divides 30, otherwise 1.
pub fn max_divisor_of_30(multiplier: NonZeroU32) -> NonZeroU32 {
    if 30 % multiplier.get() == 0 {
        multiplier
    } else {
        nonzero!(1u32)
    }
}

/// Entry point combining a ticker directory and a raw-bar provider.
pub struct ChartService<D, P> {
    directory: D,
    provider: P,
    calendar: SessionCalendar,
    settings: ChartSettings,
}

impl<D, P> ChartService<D, P>
where
    D: SecurityDirectory,
    P: DataProvider,
{
    pub fn new(directory: D, provider: P, calendar: SessionCalendar, settings: ChartSettings) -> Self {
        let settings = ChartSettings {
            page_limit: settings.page_limit.clamp(1, MAX_PAGE_LIMIT),
            ..settings
        };
        Self {
            directory,
            provider,
            calendar,
            settings,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn calendar(&self) -> &SessionCalendar {
        &self.calendar
    }

    pub fn settings(&self) -> &ChartSettings {
        &self.settings
    }

    pub async fn get_chart_data(&self, request: &ChartRequest) -> Result<ChartResponse, ChartError> {
        self.get_chart_data_at(request, Utc::now()).await
    }

    /// [`get_chart_data`](Self::get_chart_data) with the wall clock fixed at `now`.
    pub async fn get_chart_data_at(
        &self,
        request: &ChartRequest,
        now: DateTime<Utc>,
    ) -> Result<ChartResponse, ChartError> {
        if request.bar_count == 0 {
            return Err(ChartError::InvalidArguments("bars must be positive".into()));
        }
        let timeframe: Timeframe =
            request
                .timeframe
                .parse()
                .map_err(|source| ChartError::InvalidTimeframe {
                    text: request.timeframe.clone(),
                    source,
                })?;
        let plan = FetchPlan::new(timeframe, request.include_extended_hours);

        let (walk_from, reference) = match request.timestamp_ms {
            0 => (None, now),
            ms => {
                let t = tz::from_epoch_millis(ms)?;
                (Some(t), t)
            }
        };

        info!(
            security_id = request.security_id,
            timeframe = %timeframe,
            direction = %request.direction,
            bars = request.bar_count,
            base = ?plan.base,
            aggregated = plan.is_aggregated(),
            "chart request"
        );

        let mut walker = SecurityHistoryWalker::new(
            &self.directory,
            request.security_id,
            walk_from,
            request.direction,
            now,
            self.settings.query_timeout,
        );

        // Backward: newest first across tickers. Forward: ascending.
        let mut collected: Vec<Bar> = Vec::with_capacity(request.bar_count);
        let mut remaining = request.bar_count;

        while remaining > 0 {
            let Some(span) = walker.next_span().await? else {
                break;
            };
            let Some((lower, upper)) = self.clamp_window(request, &span, reference)? else {
                debug!(security_id = request.security_id, ticker = %span.ticker, "empty window, skipping");
                continue;
            };

            let probe = estimate_probe_range(
                request.direction,
                timeframe.unit(),
                timeframe.multiplier(),
                remaining,
                lower,
                upper,
                &self.calendar,
            )?;
            let params = BarsRequestParams {
                symbol: span.ticker.clone(),
                timeframe: plan.base,
                from_ms: probe.start_ms,
                to_ms: probe.end_ms,
                limit: self.settings.page_limit,
                sort: plan.sort(request.direction),
                finalized_only: !request.live_updates_allowed,
            };

            let batch = self.fetch_span(&params, &plan, request, remaining).await?;
            debug!(
                security_id = request.security_id,
                ticker = %span.ticker,
                from_ms = params.from_ms,
                to_ms = params.to_ms,
                bars = batch.len(),
                remaining = remaining - batch.len(),
                "ticker span done"
            );
            remaining -= batch.len();
            collected.extend(batch);
        }

        if collected.is_empty() {
            info!(security_id = request.security_id, "no chart data");
            return Err(ChartError::NoDataFound {
                request: Box::new(request.clone()),
            });
        }
        if request.direction == Direction::Backward {
            collected.reverse();
        }
        Ok(collected.iter().collect())
    }

    /// The part of `span` on the requested side of `reference`, or `None`
    /// when nothing is left of it.
    fn clamp_window(
        &self,
        request: &ChartRequest,
        span: &TickerSpan,
        reference: DateTime<Utc>,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, ChartError> {
        match request.direction {
            Direction::Backward => {
                let (start, end) = (span.valid_from, span.valid_to.min(reference));
                if start > end {
                    error!(
                        security_id = request.security_id,
                        ticker = %span.ticker,
                        %start,
                        %end,
                        "inverted ticker validity window"
                    );
                    return Err(ChartError::MalformedDateRange {
                        security_id: request.security_id,
                        ticker: span.ticker.clone(),
                        start,
                        end,
                    });
                }
                Ok((start < end).then_some((start, end)))
            }
            Direction::Forward => {
                let (start, end) = (span.valid_from.max(reference), span.valid_to);
                Ok((start < end).then_some((start, end)))
            }
        }
    }

    /// Pulls pages for one ticker and returns at most `wanted` bars in walk
    /// order (newest first for backward, ascending for forward).
    async fn fetch_span(
        &self,
        params: &BarsRequestParams,
        plan: &FetchPlan,
        request: &ChartRequest,
        wanted: usize,
    ) -> Result<Vec<Bar>, ChartError> {
        let mut pages = self.provider.fetch_bars(params.clone());

        match plan.bucket {
            Some(bucket) => {
                let mut agg = BucketAggregator::new(
                    &self.calendar,
                    AggregationParams {
                        bucket,
                        include_extended_hours: !plan.regular_hours_only,
                        direction: request.direction,
                        bars_wanted: wanted,
                    },
                );
                while !agg.is_satisfied() {
                    let Some(page) = self.next_page(pages.as_mut(), params).await? else {
                        break;
                    };
                    agg.extend(page);
                }
                let mut bars = agg.finish().bars;
                if request.direction == Direction::Backward {
                    bars.reverse();
                }
                Ok(bars)
            }
            None => {
                let mut bars = Vec::new();
                'pages: while let Some(page) = self.next_page(pages.as_mut(), params).await? {
                    for bar in page {
                        if plan.regular_hours_only && !self.calendar.is_regular_hours(bar.timestamp) {
                            continue;
                        }
                        bars.push(bar);
                        if bars.len() == wanted {
                            break 'pages;
                        }
                    }
                }
                Ok(bars)
            }
        }
    }

    async fn next_page(
        &self,
        pages: &mut (dyn BarPages + '_),
        params: &BarsRequestParams,
    ) -> Result<Option<Vec<Bar>>, ChartError> {
        match tokio::time::timeout(self.settings.page_timeout, pages.next_page()).await {
            Ok(Ok(page)) => Ok(page),
            Ok(Err(source)) => Err(ChartError::Provider {
                ticker: params.symbol.clone(),
                from_ms: params.from_ms,
                to_ms: params.to_ms,
                source,
            }),
            Err(_) => Err(ChartError::ProviderTimeout {
                ticker: params.symbol.clone(),
                from_ms: params.from_ms,
                to_ms: params.to_ms,
                after: self.settings.page_timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(text: &str, extended: bool) -> FetchPlan {
        FetchPlan::new(text.parse().unwrap(), extended)
    }

    #[test]
    fn divisors_of_thirty_are_native() {
        for m in [1u32, 2, 3, 5, 6, 10, 15, 30] {
            let m = NonZeroU32::new(m).unwrap();
            assert_eq!(max_divisor_of_30(m), m);
        }
        for m in [4u32, 7, 20, 45, 60] {
            assert_eq!(max_divisor_of_30(NonZeroU32::new(m).unwrap()).get(), 1);
        }
    }

    #[test]
    fn native_minutes_skip_aggregation() {
        let p = plan("15", false);
        assert_eq!(p.base, TimeFrame::new(nonzero!(15u32), TimeframeUnit::Minute.provider_unit()));
        assert!(!p.is_aggregated());
        assert!(p.regular_hours_only);
        assert_eq!(p.sort(Direction::Backward), Sort::Desc);
    }

    #[test]
    fn forty_five_minutes_aggregate_from_one() {
        let p = plan("45", false);
        assert_eq!(p.base, TimeFrame::new(nonzero!(1u32), TimeframeUnit::Minute.provider_unit()));
        assert_eq!(p.bucket, Some(chrono::Duration::minutes(45)));
        assert_eq!(p.sort(Direction::Backward), Sort::Asc);
    }

    #[test]
    fn odd_seconds_aggregate_from_one_second() {
        let p = plan("7s", true);
        assert_eq!(p.base, TimeFrame::new(nonzero!(1u32), TimeframeUnit::Second.provider_unit()));
        assert_eq!(p.bucket, Some(chrono::Duration::seconds(7)));
        assert!(!p.regular_hours_only);
    }

    #[test]
    fn regular_hours_use_thirty_minute_base() {
        let p = plan("2h", false);
        assert_eq!(p.base, TimeFrame::new(nonzero!(30u32), TimeframeUnit::Minute.provider_unit()));
        assert_eq!(p.bucket, Some(chrono::Duration::minutes(120)));

        let p = plan("2h", true);
        assert_eq!(p.base, TimeFrame::new(nonzero!(2u32), TimeframeUnit::Hour.provider_unit()));
        assert!(!p.is_aggregated());
    }

    #[test]
    fn huge_minute_multiples_keep_a_positive_bucket() {
        let p = plan("3000000000", false);
        assert_eq!(p.base, TimeFrame::new(nonzero!(1u32), TimeframeUnit::Minute.provider_unit()));
        assert_eq!(p.bucket, Some(chrono::Duration::minutes(3_000_000_000)));

        let p = plan("3000000000h", false);
        assert!(p.bucket.is_some_and(|b| b > chrono::Duration::zero()));
    }

    #[test]
    fn daily_and_up_are_native_and_unfiltered() {
        for text in ["1d", "1w", "3m", "1y"] {
            let p = plan(text, false);
            assert!(!p.is_aggregated(), "{text}");
            assert!(!p.regular_hours_only, "{text}");
        }
    }
}
