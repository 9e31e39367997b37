//! Indicator value types produced by the engine.
//!
//! Early-window values are `None` until an indicator has enough history,
//! never a placeholder number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::bar::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmaIndicator {
    pub value: f64,
    pub period: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiIndicator {
    pub value: f64,
    pub period: u32,
}

/// Direction of a MACD histogram sign change on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossDirection {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdIndicator {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    /// Set only on the bar where the histogram changed sign.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross: Option<CrossDirection>,
    /// Rolling mean of |histogram|, the normalization scale for confidence.
    pub histogram_scale: f64,
}

/// Snapshot of all indicator values after applying one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub close: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma: Option<SmaIndicator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<RsiIndicator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd: Option<MacdIndicator>,
}
