//! Unit tests for the indicator engine

use chrono::{TimeZone, Utc};
use marketpulse::indicators::{IndicatorConfig, IndicatorEngine, UpdateOutcome};
use marketpulse::models::bar::{Bar, Timeframe};
use marketpulse::models::indicators::CrossDirection;

fn bar_at(minute: i64, close: f64) -> Bar {
    Bar::new(
        Utc.timestamp_opt(minute * 60, 0).unwrap(),
        close,
        close + 0.1,
        close - 0.1,
        close,
        1000.0,
    )
}

fn small_config() -> IndicatorConfig {
    IndicatorConfig {
        sma_period: 3,
        rsi_period: 3,
        macd_fast: 3,
        macd_slow: 6,
        macd_signal: 3,
    }
}

#[test]
fn test_snapshot_timestamp_matches_bar() {
    let mut engine = IndicatorEngine::new(IndicatorConfig::default());
    let bar = bar_at(1, 100.0);
    match engine.update("BTC-USD", Timeframe::M1, &bar) {
        UpdateOutcome::Applied(snapshot) => {
            assert_eq!(snapshot.timestamp, bar.timestamp);
            assert_eq!(snapshot.close, 100.0);
            assert!(snapshot.sma.is_none());
            assert!(snapshot.rsi.is_none());
            assert!(snapshot.macd.is_none());
        }
        other => panic!("expected Applied, got {:?}", other),
    }
}

#[test]
fn test_out_of_order_and_duplicate_bars_dropped() {
    let mut engine = IndicatorEngine::new(small_config());
    let key = ("ETH-USD", Timeframe::M1);

    assert!(matches!(
        engine.update(key.0, key.1, &bar_at(10, 100.0)),
        UpdateOutcome::Applied(_)
    ));
    assert!(matches!(
        engine.update(key.0, key.1, &bar_at(10, 101.0)),
        UpdateOutcome::OutOfOrder { .. }
    ));
    assert!(matches!(
        engine.update(key.0, key.1, &bar_at(9, 99.0)),
        UpdateOutcome::OutOfOrder { .. }
    ));

    // Dropped bars must not have touched the window: two more closes
    // complete the 3-bar SMA from the applied bars only.
    engine.update(key.0, key.1, &bar_at(11, 102.0));
    match engine.update(key.0, key.1, &bar_at(12, 104.0)) {
        UpdateOutcome::Applied(snapshot) => {
            let sma = snapshot.sma.expect("SMA defined after three applied bars");
            assert!((sma.value - (100.0 + 102.0 + 104.0) / 3.0).abs() < 1e-9);
        }
        other => panic!("expected Applied, got {:?}", other),
    }
}

#[test]
fn test_spec_window_sma_value() {
    let mut engine = IndicatorEngine::new(IndicatorConfig {
        sma_period: 5,
        ..IndicatorConfig::default()
    });
    let mut last_sma = None;
    for i in 1..=15 {
        if let UpdateOutcome::Applied(snapshot) =
            engine.update("EURUSD", Timeframe::M1, &bar_at(i, i as f64))
        {
            last_sma = snapshot.sma;
        }
    }
    assert_eq!(last_sma.map(|s| s.value), Some(13.0));
}

#[test]
fn test_histogram_crossovers_reported_exactly_once() {
    let mut engine = IndicatorEngine::new(small_config());
    let mut histograms: Vec<f64> = Vec::new();
    let mut crosses: Vec<(usize, CrossDirection)> = Vec::new();

    for i in 0..200 {
        let close = 100.0 + 10.0 * ((i as f64) / 10.0).sin();
        if let UpdateOutcome::Applied(snapshot) =
            engine.update("BTC-USD", Timeframe::M1, &bar_at(i, close))
        {
            if let Some(macd) = snapshot.macd {
                if let Some(direction) = macd.cross {
                    crosses.push((histograms.len(), direction));
                }
                histograms.push(macd.histogram);
            }
        }
    }

    // Recompute sign changes from the emitted histogram series and demand
    // a one-to-one match with the reported crossings.
    let mut expected: Vec<(usize, CrossDirection)> = Vec::new();
    for i in 1..histograms.len() {
        let prev = histograms[i - 1];
        let cur = histograms[i];
        if prev < 0.0 && cur >= 0.0 {
            expected.push((i, CrossDirection::Bullish));
        } else if prev >= 0.0 && cur < 0.0 {
            expected.push((i, CrossDirection::Bearish));
        }
    }
    assert!(!expected.is_empty(), "test series should produce crossovers");
    assert_eq!(crosses, expected);
}

#[test]
fn test_keys_are_independent() {
    let mut engine = IndicatorEngine::new(small_config());
    for i in 0..5 {
        engine.update("AAA", Timeframe::M1, &bar_at(i, 10.0));
        engine.update("BBB", Timeframe::M1, &bar_at(i, 1000.0 + i as f64));
    }

    match engine.update("AAA", Timeframe::M1, &bar_at(5, 10.0)) {
        UpdateOutcome::Applied(snapshot) => {
            assert!((snapshot.sma.unwrap().value - 10.0).abs() < 1e-9);
        }
        other => panic!("expected Applied, got {:?}", other),
    }
    match engine.update("BBB", Timeframe::M1, &bar_at(5, 1005.0)) {
        UpdateOutcome::Applied(snapshot) => {
            assert!(snapshot.sma.unwrap().value > 1000.0);
        }
        other => panic!("expected Applied, got {:?}", other),
    }
}

#[test]
fn test_release_resets_state() {
    let mut engine = IndicatorEngine::new(small_config());
    for i in 0..10 {
        engine.update("AAA", Timeframe::M1, &bar_at(i, 100.0 + i as f64));
    }
    assert!(engine.last_timestamp("AAA", Timeframe::M1).is_some());

    engine.release("AAA", Timeframe::M1);
    assert!(engine.last_timestamp("AAA", Timeframe::M1).is_none());

    // After release even an "old" timestamp applies again: fresh state.
    assert!(matches!(
        engine.update("AAA", Timeframe::M1, &bar_at(0, 50.0)),
        UpdateOutcome::Applied(_)
    ));
}
