//! MACD (Moving Average Convergence Divergence).
//!
//! MACD = EMA(fast) - EMA(slow)
//! Signal = EMA(signal) of MACD
//! Histogram = MACD - Signal

/// Incremental EMA, seeded with the simple average of the first `period`
/// values, then `value * k + prev * (1 - k)` with `k = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    seed_sum: f64,
    seed_count: usize,
    current: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be greater than 0");
        Self {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seed_count: 0,
            current: None,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        match self.current {
            Some(prev) => {
                self.current = Some(value * self.k + prev * (1.0 - self.k));
            }
            None => {
                self.seed_sum += value;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    self.current = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.current
    }

    pub fn value(&self) -> Option<f64> {
        self.current
    }
}

/// Raw MACD output for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Incremental MACD state.
///
/// Undefined until `slow` closes have seeded the slow EMA and `signal`
/// further MACD-line values have seeded the signal-line EMA.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        assert!(
            fast_period < slow_period,
            "MACD fast period must be shorter than slow period"
        );
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
        }
    }

    pub fn update(&mut self, close: f64) -> Option<MacdOutput> {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        let (fast, slow) = match (fast, slow) {
            (Some(f), Some(s)) => (f, s),
            _ => return None,
        };

        let macd_line = fast - slow;
        let signal_line = self.signal.update(macd_line)?;

        Some(MacdOutput {
            macd: macd_line,
            signal: signal_line,
            histogram: macd_line - signal_line,
        })
    }
}
