//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! RSI = 100 - (100 / (1 + RS))
//! RS = Average Gain / Average Loss

/// Incremental RSI state.
///
/// The first `period` gains/losses seed a simple average; every later bar
/// Wilder-smooths it: `avg = (avg * (period - 1) + x) / period`.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: f64,
    avg_loss: f64,
    /// Number of close-to-close deltas consumed so far.
    deltas: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "RSI period must be greater than 0");
        Self {
            period,
            prev_close: None,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            deltas: 0,
        }
    }

    /// Push one close and return the RSI, or `None` while fewer than
    /// `period` deltas have been seen.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        let prev = match self.prev_close.replace(close) {
            Some(prev) => prev,
            None => return None,
        };

        let gain = (close - prev).max(0.0);
        let loss = (prev - close).max(0.0);
        self.deltas += 1;

        if self.deltas <= self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            if self.deltas == self.period {
                self.avg_gain = self.gain_sum / self.period as f64;
                self.avg_loss = self.loss_sum / self.period as f64;
            }
        } else {
            let p = self.period as f64;
            self.avg_gain = (self.avg_gain * (p - 1.0) + gain) / p;
            self.avg_loss = (self.avg_loss * (p - 1.0) + loss) / p;
        }

        self.value()
    }

    /// Current RSI in [0, 100], or `None` while seeding.
    ///
    /// A zero average loss saturates to 100 rather than dividing by zero.
    pub fn value(&self) -> Option<f64> {
        if self.deltas < self.period {
            return None;
        }
        if self.avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = self.avg_gain / self.avg_loss;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }

    pub fn period(&self) -> usize {
        self.period
    }
}
