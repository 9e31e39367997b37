//! OHLCV bar and timeframe types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One OHLCV sample for a symbol at a given timeframe.
///
/// Bars for a (symbol, timeframe) pair are totally ordered by timestamp;
/// no two bars share a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Supported bar timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    /// 1 minute bars
    #[serde(rename = "M1")]
    #[default]
    M1,
    /// 5 minute bars
    #[serde(rename = "M5")]
    M5,
    /// 1 hour bars
    #[serde(rename = "H1")]
    H1,
    /// Daily bars
    #[serde(rename = "D1")]
    D1,
}

impl Timeframe {
    /// Bar duration in seconds.
    pub fn as_secs(&self) -> u64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::H1 => 3600,
            Timeframe::D1 => 86400,
        }
    }

    /// All supported timeframes.
    pub fn all() -> &'static [Timeframe] {
        &[Timeframe::M1, Timeframe::M5, Timeframe::H1, Timeframe::D1]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::H1 => "H1",
            Timeframe::D1 => "D1",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "M1" | "1M" => Ok(Timeframe::M1),
            "M5" | "5M" => Ok(Timeframe::M5),
            "H1" | "1H" => Ok(Timeframe::H1),
            "D1" | "1D" => Ok(Timeframe::D1),
            _ => Err(format!(
                "invalid timeframe '{}', valid options are: M1, M5, H1, D1",
                s
            )),
        }
    }
}
