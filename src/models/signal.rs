//! Trading signal types: elementary votes, the fused decision, and the
//! per-cycle stream payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::bar::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

/// One indicator's independent vote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementarySignal {
    pub action: SignalAction,
    /// Confidence in [0, 1]. Undefined indicators vote Hold with 0.
    pub confidence: f64,
}

impl ElementarySignal {
    pub fn new(action: SignalAction, confidence: f64) -> Self {
        Self {
            action,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The vote an indicator casts while it has insufficient history.
    pub fn undefined() -> Self {
        Self {
            action: SignalAction::Hold,
            confidence: 0.0,
        }
    }
}

/// Votes of the three indicators that produced a combined signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContributingSignals {
    pub sma: ElementarySignal,
    pub rsi: ElementarySignal,
    pub macd: ElementarySignal,
}

/// The fused decision for one bar. Immutable once constructed; a new value
/// is produced for every applied bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedSignal {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub action: SignalAction,
    pub strength: f64,
    /// Timestamp of the latest bar consumed to produce this signal.
    pub timestamp: DateTime<Utc>,
    pub contributing: ContributingSignals,
}

/// Per-symbol entry of a stream cycle: the latest signal, or the error
/// that took the symbol's lane down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SymbolUpdate {
    Signal {
        signal: CombinedSignal,
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
    },
}

/// One emission cycle covering every symbol of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamUpdate {
    pub timestamp: DateTime<Utc>,
    pub signals: BTreeMap<String, SymbolUpdate>,
}
