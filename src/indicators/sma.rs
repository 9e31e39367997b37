//! SMA (Simple Moving Average) over a sliding close window.

use std::collections::VecDeque;

/// Incremental SMA state.
///
/// Keeps the last `period` closes and their running sum, so each update is
/// O(1) instead of re-summing the window.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be greater than 0");
        Self {
            period,
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }

    /// Push one close and return the SMA, or `None` while fewer than
    /// `period` closes have been seen.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        self.window.push_back(close);
        self.sum += close;
        if self.window.len() > self.period {
            if let Some(evicted) = self.window.pop_front() {
                self.sum -= evicted;
            }
        }
        self.value()
    }

    /// Current SMA, or `None` while the window is not yet full.
    pub fn value(&self) -> Option<f64> {
        if self.window.len() < self.period {
            return None;
        }
        Some(self.sum / self.period as f64)
    }

    pub fn period(&self) -> usize {
        self.period
    }
}
