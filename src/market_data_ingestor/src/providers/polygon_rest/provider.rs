use std::num::NonZeroU32;

use async_trait::async_trait;
use chrono::Utc;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use snafu::{OptionExt, ResultExt};
use tracing::debug;

use crate::{
    models::{bar::Bar, request_params::BarsRequestParams},
    providers::{
        BarPages, BoxedPages, DataProvider, ProviderError, ProviderInitError, is_finalized,
        errors::{
            ApiSnafu, ClientBuildSnafu, InvalidBaseUrlSnafu, MalformedPageSnafu,
            MissingEnvVarSnafu, ReqwestSnafu,
        },
        polygon_rest::{
            params::{construct_path, construct_query, validate_params},
            response::PolygonAggsResponse,
        },
    },
};

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "POLYGON_API_KEY";

/// Free-tier quota.
pub const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = nonzero!(5u32);

pub struct PolygonProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    limiter: DefaultDirectRateLimiter,
}

impl PolygonProvider {
    /// Creates a provider against the public endpoint.
    ///
    /// Reads the API key from the `POLYGON_API_KEY` environment variable.
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::from_env(DEFAULT_BASE_URL, DEFAULT_REQUESTS_PER_MINUTE)
    }

    /// Like [`with_settings`](Self::with_settings), with the key taken from
    /// `POLYGON_API_KEY`.
    pub fn from_env(base_url: &str, requests_per_minute: NonZeroU32) -> Result<Self, ProviderInitError> {
        let api_key = std::env::var(API_KEY_ENV).context(MissingEnvVarSnafu { name: API_KEY_ENV })?;
        Self::with_settings(base_url, SecretString::new(api_key.into()), requests_per_minute)
    }

    /// Creates a provider with an explicit endpoint, key and request quota.
    pub fn with_settings(
        base_url: &str,
        api_key: SecretString,
        requests_per_minute: NonZeroU32,
    ) -> Result<Self, ProviderInitError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return InvalidBaseUrlSnafu { url: base_url }.fail();
        }

        let client = Client::builder().build().context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            limiter: RateLimiter::direct(Quota::per_minute(requests_per_minute)),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&[("apiKey", self.api_key.expose_secret())])
    }
}

impl DataProvider for PolygonProvider {
    fn fetch_bars(&self, params: BarsRequestParams) -> BoxedPages<'_> {
        Box::new(PolygonPages {
            provider: self,
            params,
            cursor: Cursor::First,
            pages_seen: 0,
        })
    }
}

enum Cursor {
    First,
    Next(String),
    Done,
}

struct PolygonPages<'a> {
    provider: &'a PolygonProvider,
    params: BarsRequestParams,
    cursor: Cursor,
    pages_seen: usize,
}

#[async_trait]
impl BarPages for PolygonPages<'_> {
    async fn next_page(&mut self) -> Result<Option<Vec<Bar>>, ProviderError> {
        // Any early return below leaves the cursor exhausted.
        let request = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Done => return Ok(None),
            Cursor::First => {
                validate_params(&self.params)?;
                let url = format!("{}{}", self.provider.base_url, construct_path(&self.params));
                self.provider
                    .client
                    .get(url)
                    .query(&construct_query(&self.params))
            }
            Cursor::Next(url) => self.provider.client.get(url),
        };
        let request = self.provider.authorize(request);

        self.provider.limiter.until_ready().await;

        let response = request.send().await.context(ReqwestSnafu)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu {
                message: format!("{status}: {body}"),
            }
            .fail();
        }

        let page: PolygonAggsResponse = response.json().await.context(ReqwestSnafu)?;
        if !page.is_success() {
            return ApiSnafu {
                message: page.error_message(),
            }
            .fail();
        }

        if let Some(next) = page.next_url.filter(|u| !u.is_empty()) {
            self.cursor = Cursor::Next(next);
        }
        self.pages_seen += 1;

        let now = Utc::now();

        let mut bars = Vec::with_capacity(page.results.len());
        for raw in page.results {
            let raw_ts = raw.timestamp_ms;
            let bar = raw.into_bar().context(MalformedPageSnafu {
                message: format!("timestamp {raw_ts} out of range"),
            })?;
            if self.params.finalized_only && !is_finalized(&bar, &self.params.timeframe, now) {
                continue;
            }
            bars.push(bar);
        }

        debug!(
            ticker = %self.params.symbol,
            page = self.pages_seen,
            bars = bars.len(),
            has_more = matches!(self.cursor, Cursor::Next(_)),
            "fetched aggregates page"
        );

        Ok(Some(bars))
    }
}
