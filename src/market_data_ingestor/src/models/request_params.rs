use serde::{Deserialize, Serialize};

use crate::models::timeframe::TimeFrame;

/// Largest page a single upstream request may ask for.
pub const MAX_PAGE_LIMIT: u32 = 50_000;

/// Order in which bars come back from the provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    #[default]
    Asc,
    Desc,
}

impl Sort {
    pub const fn as_str(self) -> &'static str {
        match self {
            Sort::Asc => "asc",
            Sort::Desc => "desc",
        }
    }
}

/// Universal parameters for requesting bars for one ticker from any provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarsRequestParams {
    /// Vendor ticker symbol (e.g., `"AAPL"`).
    pub symbol: String,

    /// Granularity of the bars to fetch.
    pub timeframe: TimeFrame,

    /// Start of the requested range, epoch milliseconds (inclusive).
    pub from_ms: i64,

    /// End of the requested range, epoch milliseconds (inclusive).
    pub to_ms: i64,

    /// Page size requested from the upstream, at most [`MAX_PAGE_LIMIT`].
    pub limit: u32,

    pub sort: Sort,

    /// When set, bars whose interval has not closed yet are withheld.
    #[serde(default)]
    pub finalized_only: bool,
}
