use std::time::Duration;

use market_data_ingestor::providers::ProviderError;
use thiserror::Error;

use crate::{
    directory::DirectoryError, request::ChartRequest, timeframe::TimeframeError,
    tz::TimeConversionError,
};

/// Everything `get_chart_data` can fail with.
///
/// Nothing here is fatal to the process; each variant carries enough context
/// to diagnose the failure without re-running the request.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("invalid timeframe {text:?}")]
    InvalidTimeframe {
        text: String,
        #[source]
        source: TimeframeError,
    },

    #[error("invalid direction {0:?}, expected \"backward\" or \"forward\"")]
    InvalidDirection(String),

    #[error("security {security_id}: ticker {ticker} has inverted window {start}..{end}")]
    MalformedDateRange {
        security_id: i64,
        ticker: String,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    #[error("security {security_id}: ticker history lookup exceeded {after:?}")]
    QueryTimeout { security_id: i64, after: Duration },

    #[error("security {security_id}: ticker history lookup failed")]
    Directory {
        security_id: i64,
        #[source]
        source: DirectoryError,
    },

    #[error("provider failed for {ticker} in [{from_ms}, {to_ms}]")]
    Provider {
        ticker: String,
        from_ms: i64,
        to_ms: i64,
        #[source]
        source: ProviderError,
    },

    #[error("provider page for {ticker} in [{from_ms}, {to_ms}] exceeded {after:?}")]
    ProviderTimeout {
        ticker: String,
        from_ms: i64,
        to_ms: i64,
        after: Duration,
    },

    #[error(transparent)]
    TimeConversion(#[from] TimeConversionError),

    #[error("no bars found for security {} ({} {} x{})",
        request.security_id, request.timeframe, request.direction, request.bar_count)]
    NoDataFound { request: Box<ChartRequest> },
}

impl ChartError {
    /// Deadline failures, as opposed to malformed queries or upstream errors.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ChartError::QueryTimeout { .. } | ChartError::ProviderTimeout { .. }
        )
    }
}
