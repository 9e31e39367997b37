//! Unit tests for Wilder's RSI

use marketpulse::indicators::Rsi;

#[test]
fn test_rsi_undefined_while_seeding() {
    let mut rsi = Rsi::new(14);
    // 14 deltas need 15 closes; the first 14 closes leave it undefined.
    for i in 0..14 {
        assert!(rsi.update(100.0 + i as f64).is_none());
    }
    assert!(rsi.update(114.0).is_some());
}

#[test]
fn test_rsi_saturates_at_100_when_no_losses() {
    let mut rsi = Rsi::new(14);
    let mut last = None;
    for i in 0..40 {
        last = rsi.update(100.0 + i as f64);
    }
    assert_eq!(last, Some(100.0));
}

#[test]
fn test_rsi_zero_when_no_gains() {
    let mut rsi = Rsi::new(14);
    let mut last = None;
    for i in 0..40 {
        last = rsi.update(100.0 - i as f64);
    }
    assert_eq!(last, Some(0.0));
}

#[test]
fn test_rsi_stays_in_bounds() {
    let closes = [
        44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8, 46.1, 45.9, 46.3, 46.8, 46.5,
        46.0, 46.4, 46.2, 45.6, 46.2, 46.3,
    ];
    let mut rsi = Rsi::new(14);
    for close in closes {
        if let Some(value) = rsi.update(close) {
            assert!((0.0..=100.0).contains(&value), "RSI out of bounds: {}", value);
        }
    }
}

#[test]
fn test_rsi_wilder_smoothing_hand_computed() {
    // period 2, closes 10 -> 11 -> 10.5 -> 11.5
    // deltas: +1.0, -0.5, +1.0
    // seed: avg_gain = 0.5, avg_loss = 0.25 -> RS = 2 -> RSI = 66.666..
    // next: avg_gain = (0.5 + 1.0) / 2 = 0.75, avg_loss = 0.125
    //       RS = 6 -> RSI = 100 - 100/7 = 85.714..
    let mut rsi = Rsi::new(2);
    assert!(rsi.update(10.0).is_none());
    assert!(rsi.update(11.0).is_none());

    let seeded = rsi.update(10.5).expect("defined after two deltas");
    assert!((seeded - 200.0 / 3.0).abs() < 1e-9);

    let smoothed = rsi.update(11.5).expect("still defined");
    assert!((smoothed - (100.0 - 100.0 / 7.0)).abs() < 1e-9);
}
