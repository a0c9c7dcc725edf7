#![cfg(test)]
use chrono::{Duration, Utc};
use market_data_ingestor::{
    models::{
        request_params::{BarsRequestParams, Sort},
        timeframe::{TimeFrame, TimeFrameUnit},
    },
    providers::{DataProvider, ProviderError, polygon_rest::PolygonProvider},
};
use nonzero_ext::nonzero;
use serial_test::serial;

fn daily_params(symbol: &str, limit: u32) -> BarsRequestParams {
    let end = Utc::now() - Duration::days(1);
    BarsRequestParams {
        symbol: symbol.to_string(),
        timeframe: TimeFrame::new(nonzero!(1u32), TimeFrameUnit::Day),
        from_ms: (end - Duration::days(10)).timestamp_millis(),
        to_ms: end.timestamp_millis(),
        limit,
        sort: Sort::Desc,
        finalized_only: true,
    }
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_polygon_provider_fetch_bars() {
    // This test requires POLYGON_API_KEY to be set in the environment (or a .env file).
    dotenvy::dotenv().ok();
    if std::env::var("POLYGON_API_KEY").is_err() {
        println!("Skipping test_polygon_provider_fetch_bars: API key not set.");
        return;
    }

    let provider = PolygonProvider::new().expect("Failed to create PolygonProvider");
    let mut pages = provider.fetch_bars(daily_params("AAPL", 5));

    let first = pages
        .next_page()
        .await
        .expect("first page")
        .expect("at least one page");
    assert!(!first.is_empty(), "Expected to fetch at least one bar for AAPL");
    assert!(first.len() <= 5, "Expected at most 5 bars due to limit");

    if first.len() > 1 {
        assert!(first[0].timestamp > first[1].timestamp);
    }
}

#[tokio::test]
async fn invalid_limit_fails_before_any_request() {
    // Unroutable endpoint: validation must reject the params before connecting.
    let provider = PolygonProvider::with_settings(
        "http://127.0.0.1:9",
        secrecy::SecretString::new("unused".to_string().into()),
        nonzero!(1u32),
    )
    .unwrap();

    let mut pages = provider.fetch_bars(daily_params("AAPL", 0));
    let err = pages.next_page().await.unwrap_err();
    assert!(matches!(err, ProviderError::Validation { .. }));
    assert!(pages.next_page().await.unwrap().is_none());
}
