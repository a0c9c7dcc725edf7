//! Request and response shapes at the chart boundary.
//!
//! Callers send camelCase JSON:
//!
//! ```json
//! {"securityId": 1, "timeframe": "1h", "timestamp": 0, "direction": "backward",
//!  "bars": 5, "extendedHours": false, "isReplay": false}
//! ```
//!
//! and receive an ascending array of `{time, open, high, low, close, volume}`
//! where `time` is epoch seconds.

use std::{fmt, str::FromStr};

use market_data_ingestor::models::bar::Bar;
use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// Which way to walk from the reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Bars at or before the reference, most recent first.
    Backward,
    /// Bars at or after the reference, oldest first.
    Forward,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Backward => "backward",
            Direction::Forward => "forward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backward" => Ok(Direction::Backward),
            "forward" => Ok(Direction::Forward),
            other => Err(ChartError::InvalidDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRequest {
    pub security_id: i64,
    /// Unparsed timeframe text, e.g. `"5"`, `"1h"`, `"1d"`.
    pub timeframe: String,
    /// Reference instant in epoch milliseconds; `0` means now.
    pub timestamp_ms: i64,
    pub direction: Direction,
    pub bar_count: usize,
    pub include_extended_hours: bool,
    /// Whether bars still in progress may be returned.
    pub live_updates_allowed: bool,
}

/// Wire form of [`ChartRequest`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequestPayload {
    pub security_id: i64,
    pub timeframe: String,
    #[serde(default)]
    pub timestamp: i64,
    pub direction: String,
    pub bars: i64,
    #[serde(default)]
    pub extended_hours: bool,
    #[serde(default)]
    pub is_replay: bool,
}

impl TryFrom<ChartRequestPayload> for ChartRequest {
    type Error = ChartError;

    fn try_from(p: ChartRequestPayload) -> Result<Self, Self::Error> {
        if p.bars <= 0 {
            return Err(ChartError::InvalidArguments(format!(
                "bars must be positive, got {}",
                p.bars
            )));
        }
        if p.timestamp < 0 {
            return Err(ChartError::InvalidArguments(format!(
                "timestamp must not be negative, got {}",
                p.timestamp
            )));
        }
        let bar_count = usize::try_from(p.bars)
            .map_err(|_| ChartError::InvalidArguments(format!("bars {} too large", p.bars)))?;
        let direction = p.direction.parse()?;

        Ok(ChartRequest {
            security_id: p.security_id,
            timeframe: p.timeframe,
            timestamp_ms: p.timestamp,
            direction,
            bar_count,
            include_extended_hours: p.extended_hours,
            live_updates_allowed: !p.is_replay,
        })
    }
}

impl ChartRequest {
    pub fn from_json(json: &str) -> Result<Self, ChartError> {
        let payload: ChartRequestPayload =
            serde_json::from_str(json).map_err(|e| ChartError::InvalidArguments(e.to_string()))?;
        payload.try_into()
    }
}

/// One bar as returned to chart clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartBar {
    /// Bucket start in epoch seconds.
    pub time: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl From<&Bar> for ChartBar {
    fn from(bar: &Bar) -> Self {
        Self {
            time: bar.timestamp.timestamp_millis() as f64 / 1000.0,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

/// Bars in strictly ascending time order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartResponse(Vec<ChartBar>);

impl ChartResponse {
    pub fn bars(&self) -> &[ChartBar] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<ChartBar> {
        self.0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<'a> FromIterator<&'a Bar> for ChartResponse {
    fn from_iter<T: IntoIterator<Item = &'a Bar>>(iter: T) -> Self {
        Self(iter.into_iter().map(ChartBar::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn parses_full_payload() {
        let req = ChartRequest::from_json(
            r#"{"securityId":1,"timeframe":"1h","timestamp":1704205800000,
                "direction":"forward","bars":5,"extendedHours":true,"isReplay":true}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            ChartRequest {
                security_id: 1,
                timeframe: "1h".into(),
                timestamp_ms: 1_704_205_800_000,
                direction: Direction::Forward,
                bar_count: 5,
                include_extended_hours: true,
                live_updates_allowed: false,
            }
        );
    }

    #[test]
    fn optional_fields_default() {
        let req = ChartRequest::from_json(
            r#"{"securityId":1,"timeframe":"5","direction":"backward","bars":3}"#,
        )
        .unwrap();
        assert_eq!(req.timestamp_ms, 0);
        assert!(!req.include_extended_hours);
        assert!(req.live_updates_allowed);
    }

    #[test]
    fn missing_or_bad_fields_are_invalid_arguments() {
        for json in [
            r#"{"timeframe":"5","direction":"backward","bars":3}"#,
            r#"{"securityId":1,"timeframe":"5","direction":"backward","bars":0}"#,
            r#"{"securityId":1,"timeframe":"5","direction":"backward","bars":-2}"#,
            r#"{"securityId":1,"timeframe":"5","direction":"backward","bars":3,"timestamp":-1}"#,
            r#"{"securityId":"one","timeframe":"5","direction":"backward","bars":3}"#,
            "not json",
        ] {
            assert!(
                matches!(ChartRequest::from_json(json), Err(ChartError::InvalidArguments(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn plural_direction_is_rejected() {
        let err = ChartRequest::from_json(
            r#"{"securityId":1,"timeframe":"5","direction":"forwards","bars":3}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ChartError::InvalidDirection(d) if d == "forwards"));
    }

    #[test]
    fn response_serializes_as_array_of_seconds() {
        let bar = Bar::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap(),
            1.0,
            2.0,
            0.5,
            1.5,
            10.0,
        );
        let resp: ChartResponse = [&bar].into_iter().collect();
        assert_eq!(
            resp.to_json().unwrap(),
            r#"[{"time":1704205800.0,"open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}]"#
        );
    }
}
