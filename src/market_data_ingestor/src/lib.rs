//! Raw OHLCV bar retrieval from upstream market-data vendors.
//!
//! The crate exposes one vendor-agnostic surface, [`providers::DataProvider`],
//! which hands back a lazy, page-at-a-time cursor of [`models::bar::Bar`]s.
//! Callers decide how far to pull; nothing is fetched until the first page is
//! requested.

pub mod models;
pub mod providers;
