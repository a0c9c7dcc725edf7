//! Chart engine configuration: parsing and loading.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! database_url = "chart.db"
//! query_timeout_ms = 3000
//!
//! [session]
//! timezone = "America/New_York"
//! regular_open = "09:30"
//! regular_close = "16:00"
//!
//! [provider]
//! base_url = "https://api.polygon.io"
//! page_limit = 50000
//! page_timeout_ms = 15000
//! requests_per_minute = 5
//! ```
//!
//! Entrypoints:
//! - Parse from a TOML string: [`load_config_str`]
//! - Parse from a file path: [`load_config_path`]

use std::{num::NonZeroU32, path::PathBuf, time::Duration};

use chrono::NaiveTime;
use chrono_tz::Tz;
use market_data_ingestor::{models::request_params::MAX_PAGE_LIMIT, providers::polygon_rest};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    chart::{ChartSettings, DEFAULT_PAGE_TIMEOUT, DEFAULT_QUERY_TIMEOUT},
    session::{SessionCalendar, SessionError},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML")]
    Parse(#[from] toml::de::Error),

    #[error("unknown time zone {0:?}")]
    UnknownTimezone(String),

    #[error("session.{field} = {value:?} is not HH:MM")]
    BadSessionTime { field: &'static str, value: String },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("provider.requests_per_minute must be positive")]
    ZeroRequestsPerMinute,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ChartConfig {
    /// SQLite path of the ticker-history directory.
    pub database_url: String,
    pub query_timeout_ms: u64,
    pub session: SessionCfg,
    pub provider: ProviderCfg,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct SessionCfg {
    /// IANA zone name.
    pub timezone: String,
    pub regular_open: String,
    pub regular_close: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProviderCfg {
    pub base_url: String,
    /// Larger values are clamped to the upstream maximum.
    pub page_limit: u32,
    pub page_timeout_ms: u64,
    pub requests_per_minute: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            database_url: "chart.db".to_string(),
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT.as_millis() as u64,
            session: SessionCfg::default(),
            provider: ProviderCfg::default(),
        }
    }
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            regular_open: "09:30".to_string(),
            regular_close: "16:00".to_string(),
        }
    }
}

impl Default for ProviderCfg {
    fn default() -> Self {
        Self {
            base_url: polygon_rest::DEFAULT_BASE_URL.to_string(),
            page_limit: MAX_PAGE_LIMIT,
            page_timeout_ms: DEFAULT_PAGE_TIMEOUT.as_millis() as u64,
            requests_per_minute: polygon_rest::DEFAULT_REQUESTS_PER_MINUTE.get(),
        }
    }
}

fn parse_hhmm(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| ConfigError::BadSessionTime {
        field,
        value: value.to_string(),
    })
}

impl ChartConfig {
    /// The injected session calendar.
    pub fn calendar(&self) -> Result<SessionCalendar, ConfigError> {
        let tz: Tz = self
            .session
            .timezone
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(self.session.timezone.clone()))?;
        let open = parse_hhmm("regular_open", &self.session.regular_open)?;
        let close = parse_hhmm("regular_close", &self.session.regular_close)?;
        Ok(SessionCalendar::new(tz, open, close)?)
    }

    pub fn settings(&self) -> ChartSettings {
        ChartSettings {
            query_timeout: Duration::from_millis(self.query_timeout_ms),
            page_limit: self.provider.page_limit.clamp(1, MAX_PAGE_LIMIT),
            page_timeout: Duration::from_millis(self.provider.page_timeout_ms),
        }
    }

    pub fn requests_per_minute(&self) -> Result<NonZeroU32, ConfigError> {
        NonZeroU32::new(self.provider.requests_per_minute).ok_or(ConfigError::ZeroRequestsPerMinute)
    }

    /// Checks every derived value once, so later accessors cannot fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.calendar()?;
        self.requests_per_minute()?;
        Ok(())
    }
}

pub fn load_config_str(toml_str: &str) -> Result<ChartConfig, ConfigError> {
    let cfg: ChartConfig = toml::from_str(toml_str)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_config_path(path: impl AsRef<std::path::Path>) -> Result<ChartConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_str(&text)
}
