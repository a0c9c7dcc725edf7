//! REST client for a Polygon-style aggregates endpoint.
//!
//! `GET /v2/aggs/ticker/{ticker}/range/{multiplier}/{timespan}/{from}/{to}`
//! returns one page of bars plus an optional `next_url` cursor.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::{API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_REQUESTS_PER_MINUTE, PolygonProvider};
