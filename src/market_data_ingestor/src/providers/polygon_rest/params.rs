use crate::{
    models::request_params::{BarsRequestParams, MAX_PAGE_LIMIT},
    providers::{ProviderError, errors::ValidationSnafu},
};

/// Checks the request against what the aggregates endpoint accepts.
pub fn validate_params(params: &BarsRequestParams) -> Result<(), ProviderError> {
    if params.symbol.trim().is_empty() {
        return ValidationSnafu {
            message: "symbol must not be empty",
        }
        .fail();
    }
    if params.limit == 0 || params.limit > MAX_PAGE_LIMIT {
        return ValidationSnafu {
            message: format!("limit must be within 1..={MAX_PAGE_LIMIT}, got {}", params.limit),
        }
        .fail();
    }
    if params.from_ms > params.to_ms {
        return ValidationSnafu {
            message: format!("range start {} is after end {}", params.from_ms, params.to_ms),
        }
        .fail();
    }
    Ok(())
}

/// Path of the first page, relative to the provider base URL.
pub fn construct_path(params: &BarsRequestParams) -> String {
    format!(
        "/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
        params.symbol,
        params.timeframe.amount,
        params.timeframe.unit.as_str(),
        params.from_ms,
        params.to_ms
    )
}

/// Query string of the first page. Follow-up pages reuse the `next_url`
/// handed back by the API, which already carries these.
pub fn construct_query(params: &BarsRequestParams) -> Vec<(String, String)> {
    vec![
        ("adjusted".to_string(), "true".to_string()),
        ("sort".to_string(), params.sort.as_str().to_string()),
        ("limit".to_string(), params.limit.to_string()),
    ]
}
