use chrono::DateTime;
use serde::Deserialize;

use crate::models::bar::Bar;

#[derive(Deserialize, Debug)]
pub struct PolygonBar {
    /// Bar start, epoch milliseconds.
    #[serde(rename = "t")]
    pub timestamp_ms: i64,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v", default)]
    pub volume: f64,
    #[serde(rename = "vw")]
    pub vwap: Option<f64>,
    #[serde(rename = "n")]
    pub trade_count: Option<u64>,
}

impl PolygonBar {
    /// `None` when the timestamp is outside chrono's representable range.
    pub fn into_bar(self) -> Option<Bar> {
        let timestamp = DateTime::from_timestamp_millis(self.timestamp_ms)?;
        Some(Bar {
            timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct PolygonAggsResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PolygonBar>,
    pub next_url: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl PolygonAggsResponse {
    /// "OK" and "DELAYED" both carry usable data.
    pub fn is_success(&self) -> bool {
        matches!(self.status.as_str(), "OK" | "DELAYED")
    }

    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| format!("status {}", self.status))
    }
}
