//! OHLCV chart engine.
//!
//! Given a security, a timeframe such as `"5"`, `"1h"` or `"1d"`, a reference
//! instant, a direction and a bar count, [`chart::ChartService`] resolves the
//! tickers that identified the security over time, pulls raw bars from a
//! [`market_data_ingestor::providers::DataProvider`], re-aggregates them when
//! the provider has no native granularity for the request, and returns exactly
//! the requested number of bars in ascending order.
//!
//! Module map, leaf first:
//! - [`timeframe`]: timeframe text parsing and formatting
//! - [`tz`] and [`session`]: time zone helpers and regular-session bounds
//! - [`aggregate`]: sequential bucket aggregation
//! - [`range`]: provider probe-window estimation
//! - [`directory`] and [`history`]: ticker validity records and the lazy walk over them
//! - [`chart`]: the orchestrator
//! - [`request`], [`error`], [`config`]: boundary types, errors and configuration
//! - [`db`], [`schema`], [`models`]: SQLite plumbing for the directory

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod history;
pub mod models;
pub mod range;
pub mod request;
pub mod schema;
pub mod session;
pub mod timeframe;
pub mod tz;

pub use chart::{ChartService, ChartSettings};
pub use error::ChartError;
pub use request::{ChartRequest, ChartResponse, Direction};
