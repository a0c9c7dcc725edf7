//! In-process provider backed by bars held in memory.
//!
//! Serves whatever bars were stored for a ticker, independent of the requested
//! granularity, so callers can script exactly what the "upstream" returns.
//! Every request is recorded for later inspection. `finalized_only` requests
//! drop bars still open at the provider's clock (the wall clock unless one is
//! pinned with [`InMemoryProvider::with_clock`]).

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    bar::Bar,
    request_params::{BarsRequestParams, Sort},
};
use crate::providers::{BarPages, BoxedPages, DataProvider, ProviderError, errors::ApiSnafu, is_finalized};

const DEFAULT_PAGE_SIZE: usize = 1_000;

#[derive(Debug, Default)]
pub struct InMemoryProvider {
    series: HashMap<String, Vec<Bar>>,
    failing: HashSet<String>,
    page_size: Option<usize>,
    clock: Option<DateTime<Utc>>,
    requests: Mutex<Vec<BarsRequestParams>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps every page at `page_size` bars, on top of the request's limit.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Judges finalized bars against `now` instead of the wall clock.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    /// Adds bars for `ticker`. Stored bars are kept in ascending time order.
    pub fn insert_bars(&mut self, ticker: &str, bars: impl IntoIterator<Item = Bar>) {
        let entry = self.series.entry(ticker.to_string()).or_default();
        entry.extend(bars);
        entry.sort_by_key(|b| b.timestamp);
    }

    /// Any request for `ticker` fails on its first page.
    pub fn fail_ticker(&mut self, ticker: &str) {
        self.failing.insert(ticker.to_string());
    }

    /// Snapshot of every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<BarsRequestParams> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DataProvider for InMemoryProvider {
    fn fetch_bars(&self, params: BarsRequestParams) -> BoxedPages<'_> {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(params.clone()),
            Err(poisoned) => poisoned.into_inner().push(params.clone()),
        }

        if self.failing.contains(&params.symbol) {
            return Box::new(MemoryPages {
                failure: Some(format!("upstream rejected {}", params.symbol)),
                bars: Vec::new(),
                cursor: 0,
                page_size: 1,
            });
        }

        let now = self.clock.unwrap_or_else(Utc::now);
        let mut bars: Vec<Bar> = self
            .series
            .get(&params.symbol)
            .map(|all| {
                all.iter()
                    .filter(|b| {
                        let ms = b.timestamp.timestamp_millis();
                        ms >= params.from_ms && ms <= params.to_ms
                    })
                    .filter(|b| !params.finalized_only || is_finalized(b, &params.timeframe, now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if params.sort == Sort::Desc {
            bars.reverse();
        }

        let limit = params.limit.max(1) as usize;
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).min(limit);

        Box::new(MemoryPages {
            failure: None,
            bars,
            cursor: 0,
            page_size,
        })
    }
}

struct MemoryPages {
    failure: Option<String>,
    bars: Vec<Bar>,
    cursor: usize,
    page_size: usize,
}

#[async_trait]
impl BarPages for MemoryPages {
    async fn next_page(&mut self) -> Result<Option<Vec<Bar>>, ProviderError> {
        if let Some(message) = self.failure.take() {
            return ApiSnafu { message }.fail();
        }
        if self.cursor >= self.bars.len() {
            return Ok(None);
        }
        let end = (self.cursor + self.page_size).min(self.bars.len());
        let page = self.bars[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(Some(page))
    }
}
