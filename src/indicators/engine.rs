//! Incremental indicator engine.
//!
//! Owns one `IndicatorState` per (symbol, timeframe) key and advances all
//! indicators bar by bar. An update either fully applies or not at all:
//! ordering is checked before any sub-state mutates.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::indicators::macd::Macd;
use crate::indicators::rsi::Rsi;
use crate::indicators::sma::Sma;
use crate::models::bar::{Bar, Timeframe};
use crate::models::indicators::{
    CrossDirection, IndicatorSnapshot, MacdIndicator, RsiIndicator, SmaIndicator,
};

/// Indicator periods for one engine instance.
#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub sma_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_period: 20,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

/// Outcome of feeding one bar to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The bar advanced the state; here is the resulting snapshot.
    Applied(IndicatorSnapshot),
    /// The bar did not advance the stream (duplicate or older than the
    /// last applied bar) and was dropped without touching any state.
    OutOfOrder { last_applied: DateTime<Utc> },
}

/// Rolling state for one (symbol, timeframe) key.
#[derive(Debug, Clone)]
pub struct IndicatorState {
    sma: Sma,
    rsi: Rsi,
    macd: Macd,
    prev_histogram: Option<f64>,
    hist_scale: Option<f64>,
    hist_scale_k: f64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl IndicatorState {
    fn new(config: &IndicatorConfig) -> Self {
        Self {
            sma: Sma::new(config.sma_period),
            rsi: Rsi::new(config.rsi_period),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            prev_histogram: None,
            hist_scale: None,
            hist_scale_k: 2.0 / (config.macd_signal as f64 + 1.0),
            last_timestamp: None,
        }
    }

    /// Timestamp of the last applied bar, if any.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    fn apply(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        bar: &Bar,
        config: &IndicatorConfig,
    ) -> UpdateOutcome {
        if let Some(last) = self.last_timestamp {
            if bar.timestamp <= last {
                return UpdateOutcome::OutOfOrder { last_applied: last };
            }
        }

        let sma = self.sma.update(bar.close);
        let rsi = self.rsi.update(bar.close);
        let macd = self.macd.update(bar.close).map(|out| {
            let cross = match self.prev_histogram {
                Some(prev) if prev < 0.0 && out.histogram >= 0.0 => Some(CrossDirection::Bullish),
                Some(prev) if prev >= 0.0 && out.histogram < 0.0 => Some(CrossDirection::Bearish),
                _ => None,
            };
            self.prev_histogram = Some(out.histogram);

            let scale = match self.hist_scale {
                Some(prev) => {
                    out.histogram.abs() * self.hist_scale_k + prev * (1.0 - self.hist_scale_k)
                }
                None => out.histogram.abs(),
            };
            self.hist_scale = Some(scale);

            MacdIndicator {
                macd: out.macd,
                signal: out.signal,
                histogram: out.histogram,
                cross,
                histogram_scale: scale,
            }
        });
        self.last_timestamp = Some(bar.timestamp);

        UpdateOutcome::Applied(IndicatorSnapshot {
            symbol: symbol.to_string(),
            timeframe,
            close: bar.close,
            timestamp: bar.timestamp,
            sma: sma.map(|value| SmaIndicator {
                value,
                period: config.sma_period as u32,
            }),
            rsi: rsi.map(|value| RsiIndicator {
                value,
                period: config.rsi_period as u32,
            }),
            macd,
        })
    }
}

/// Engine over all keys a session subscribes to.
///
/// State is owned exclusively by this instance; sessions never share one.
pub struct IndicatorEngine {
    config: IndicatorConfig,
    states: HashMap<(String, Timeframe), IndicatorState>,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// Feed one bar for a key, creating the state on first contact.
    pub fn update(&mut self, symbol: &str, timeframe: Timeframe, bar: &Bar) -> UpdateOutcome {
        let state = self
            .states
            .entry((symbol.to_string(), timeframe))
            .or_insert_with(|| IndicatorState::new(&self.config));

        let outcome = state.apply(symbol, timeframe, bar, &self.config);
        if let UpdateOutcome::OutOfOrder { last_applied } = &outcome {
            debug!(
                symbol = %symbol,
                timeframe = %timeframe,
                bar_timestamp = %bar.timestamp,
                last_applied = %last_applied,
                "dropping out-of-order bar"
            );
        }
        outcome
    }

    /// Timestamp of the last applied bar for a key.
    pub fn last_timestamp(&self, symbol: &str, timeframe: Timeframe) -> Option<DateTime<Utc>> {
        self.states
            .get(&(symbol.to_string(), timeframe))
            .and_then(|state| state.last_timestamp())
    }

    /// Drop the state for a key when its subscription ends.
    pub fn release(&mut self, symbol: &str, timeframe: Timeframe) {
        self.states.remove(&(symbol.to_string(), timeframe));
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }
}
