//! Unit tests for the synthetic bar source

use marketpulse::models::bar::Timeframe;
use marketpulse::services::{BarSource, FetchError, SyntheticBarSource};
use std::collections::HashMap;

#[tokio::test]
async fn test_fetch_returns_requested_window() {
    let source = SyntheticBarSource::default();
    let bars = source
        .fetch("BTC-USD", Timeframe::M1, 50)
        .await
        .expect("fetch should succeed");
    assert_eq!(bars.len(), 50);
}

#[tokio::test]
async fn test_bars_are_strictly_ordered_and_unique() {
    let source = SyntheticBarSource::default();
    let bars = source
        .fetch("ETH-USD", Timeframe::M5, 30)
        .await
        .expect("fetch should succeed");

    for pair in bars.windows(2) {
        assert!(
            pair[0].timestamp < pair[1].timestamp,
            "timestamps must be strictly increasing"
        );
    }
}

#[tokio::test]
async fn test_overlapping_fetches_agree() {
    let source = SyntheticBarSource::default();
    let first = source.fetch("EURUSD", Timeframe::H1, 20).await.unwrap();
    let second = source.fetch("EURUSD", Timeframe::H1, 20).await.unwrap();

    let by_timestamp: HashMap<_, _> = first
        .iter()
        .map(|bar| (bar.timestamp, bar.close))
        .collect();
    for bar in &second {
        if let Some(&close) = by_timestamp.get(&bar.timestamp) {
            assert_eq!(close, bar.close, "same bar index must reproduce the same close");
        }
    }
}

#[tokio::test]
async fn test_unknown_symbol_is_permanent() {
    let source = SyntheticBarSource::default();
    let err = source
        .fetch("NOPE", Timeframe::M1, 10)
        .await
        .expect_err("unknown symbol must fail");

    assert!(matches!(err, FetchError::UnknownSymbol { .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_different_symbols_have_different_paths() {
    let source = SyntheticBarSource::default();
    let btc = source.fetch("BTC-USD", Timeframe::M1, 10).await.unwrap();
    let eth = source.fetch("ETH-USD", Timeframe::M1, 10).await.unwrap();
    assert_ne!(btc.last().unwrap().close, eth.last().unwrap().close);
}
