//! Provider abstraction for market data sources.
//!
//! This module defines the [`DataProvider`] trait, the unified interface for
//! fetching OHLCV bars from any market data vendor, and the [`BarPages`]
//! cursor it hands back.
//!
//! Upstream bar endpoints are paginated and rate-limited, so a provider never
//! returns everything at once. `fetch_bars` only builds a cursor; each call to
//! [`BarPages::next_page`] performs at most one upstream round trip. A caller
//! that has seen enough simply stops pulling (or drops the cursor).
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_ingestor::models::{bar::Bar, request_params::BarsRequestParams};
//! use market_data_ingestor::providers::{BarPages, BoxedPages, DataProvider, ProviderError};
//!
//! struct Nothing;
//!
//! #[async_trait]
//! impl BarPages for Nothing {
//!     async fn next_page(&mut self) -> Result<Option<Vec<Bar>>, ProviderError> {
//!         Ok(None)
//!     }
//! }
//!
//! struct MyProvider;
//!
//! impl DataProvider for MyProvider {
//!     fn fetch_bars(&self, _params: BarsRequestParams) -> BoxedPages<'_> {
//!         Box::new(Nothing)
//!     }
//! }
//! ```

pub mod errors;
pub mod memory;
pub mod polygon_rest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use errors::{ProviderError, ProviderInitError};

use crate::models::{bar::Bar, request_params::BarsRequestParams, timeframe::TimeFrame};

/// Pull-based cursor over the pages of one bar request.
///
/// The three outcomes of [`next_page`](BarPages::next_page) are distinct
/// terminal/non-terminal states:
/// - `Ok(Some(page))`: another page (possibly empty after filtering).
/// - `Ok(None)`: the upstream is exhausted; later calls keep returning `None`.
/// - `Err(_)`: the fetch failed; the cursor must not be polled again.
#[async_trait]
pub trait BarPages: Send {
    async fn next_page(&mut self) -> Result<Option<Vec<Bar>>, ProviderError>;
}

/// Boxed cursor borrowed from its provider.
pub type BoxedPages<'a> = Box<dyn BarPages + 'a>;

/// Trait for fetching time-series bar data from a market data provider.
///
/// Implement this trait for each concrete data vendor. It is object safe so
/// the runtime can select a provider dynamically (`Box<dyn DataProvider>`).
pub trait DataProvider: Send + Sync {
    /// Builds a lazy cursor for `params`. No I/O happens until the first page
    /// is pulled.
    fn fetch_bars(&self, params: BarsRequestParams) -> BoxedPages<'_>;
}

impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn fetch_bars(&self, params: BarsRequestParams) -> BoxedPages<'_> {
        (**self).fetch_bars(params)
    }
}

impl<P: DataProvider + ?Sized> DataProvider for std::sync::Arc<P> {
    fn fetch_bars(&self, params: BarsRequestParams) -> BoxedPages<'_> {
        (**self).fetch_bars(params)
    }
}

/// Whether `bar`'s interval had closed by `now`.
///
/// Bars whose end is not representable never count as closed.
pub fn is_finalized(bar: &Bar, timeframe: &TimeFrame, now: DateTime<Utc>) -> bool {
    timeframe
        .nominal_duration()
        .and_then(|width| bar.timestamp.checked_add_signed(width))
        .is_some_and(|end| end <= now)
}
