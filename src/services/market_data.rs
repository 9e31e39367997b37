//! Market data provider boundary.
//!
//! Any concrete data provider plugs in behind [`BarSource`]; the engine
//! never sees broker-specific connectivity. Errors distinguish transient
//! failures (worth retrying) from permanent ones (surfaced immediately).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::models::bar::{Bar, Timeframe};

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Timeout, temporary disconnect, rate limit. Retried by the fetcher.
    #[error("transient failure fetching {symbol}: {reason}")]
    Transient { symbol: String, reason: String },
    /// The provider does not know this symbol. Never retried.
    #[error("unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },
    /// Any other non-recoverable provider failure. Never retried.
    #[error("permanent failure fetching {symbol}: {reason}")]
    Permanent { symbol: String, reason: String },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}

/// Supplier of ordered OHLCV bars for a (symbol, timeframe) pair.
#[async_trait]
pub trait BarSource: Send + Sync {
    /// Fetch the most recent `count` bars, ordered by ascending timestamp.
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, FetchError>;
}

#[async_trait]
impl<T: BarSource + ?Sized> BarSource for Arc<T> {
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, FetchError> {
        (**self).fetch(symbol, timeframe, count).await
    }
}

/// Deterministic in-process bar generator over a fixed symbol universe.
///
/// Closes follow a smooth per-symbol waveform keyed by the bar index, so
/// two fetches of overlapping ranges agree bar for bar. Stands in for a
/// real provider in the server binary and in tests.
pub struct SyntheticBarSource {
    symbols: Vec<String>,
}

impl SyntheticBarSource {
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }

    /// Per-symbol seed for the price path (FNV-1a over the name).
    fn seed(symbol: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in symbol.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }

    fn close_at(seed: u64, index: u64) -> f64 {
        let base = 100.0 + (seed % 900) as f64;
        let phase_a = (seed % 628) as f64 / 100.0;
        let phase_b = ((seed >> 16) % 628) as f64 / 100.0;
        let t = index as f64;
        base * (1.0 + 0.03 * (t / 17.0 + phase_a).sin() + 0.01 * (t / 5.3 + phase_b).sin())
    }

    fn bar_at(seed: u64, index: u64, timeframe: Timeframe) -> Result<Bar, FetchError> {
        let secs = (index * timeframe.as_secs()) as i64;
        let timestamp = DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
            FetchError::Permanent {
                symbol: String::new(),
                reason: format!("bar index {} out of timestamp range", index),
            }
        })?;

        let open = Self::close_at(seed, index.saturating_sub(1));
        let close = Self::close_at(seed, index);
        let high = open.max(close) * 1.001;
        let low = open.min(close) * 0.999;
        let volume = 1000.0 + 500.0 * (1.0 + ((index as f64) / 7.0).sin());
        Ok(Bar::new(timestamp, open, high, low, close, volume))
    }
}

impl Default for SyntheticBarSource {
    fn default() -> Self {
        Self::new(vec![
            "BTC-USD".to_string(),
            "ETH-USD".to_string(),
            "SOL-USD".to_string(),
            "EURUSD".to_string(),
        ])
    }
}

#[async_trait]
impl BarSource for SyntheticBarSource {
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, FetchError> {
        if !self.symbols.iter().any(|s| s == symbol) {
            return Err(FetchError::UnknownSymbol {
                symbol: symbol.to_string(),
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let seed = Self::seed(symbol);
        let tf_secs = timeframe.as_secs();
        // Latest completed bar boundary.
        let now_secs = Utc::now().timestamp().max(0) as u64;
        let latest_index = now_secs / tf_secs;
        let first_index = latest_index.saturating_sub(count.saturating_sub(1) as u64);

        let mut bars = Vec::with_capacity(count);
        for index in first_index..=latest_index {
            let bar = Self::bar_at(seed, index, timeframe).map_err(|err| match err {
                FetchError::Permanent { reason, .. } => FetchError::Permanent {
                    symbol: symbol.to_string(),
                    reason,
                },
                other => other,
            })?;
            bars.push(bar);
        }
        Ok(bars)
    }
}
