//! Signal fusion: one elementary vote per indicator, majority-combined
//! into a single decision.
//!
//! Combination is a pure function of the snapshot: identical indicator
//! outputs always produce the identical combined signal, regardless of
//! vote order.

use crate::models::indicators::{CrossDirection, IndicatorSnapshot};
use crate::models::signal::{
    CombinedSignal, ContributingSignals, ElementarySignal, SignalAction,
};

/// Vote thresholds.
#[derive(Debug, Clone)]
pub struct CombinerConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
        }
    }
}

pub struct SignalCombiner {
    config: CombinerConfig,
}

impl SignalCombiner {
    pub fn new(config: CombinerConfig) -> Self {
        Self { config }
    }

    /// Fuse the snapshot's indicator values into one combined signal.
    pub fn combine(&self, snapshot: &IndicatorSnapshot) -> CombinedSignal {
        let contributing = ContributingSignals {
            sma: self.sma_vote(snapshot),
            rsi: self.rsi_vote(snapshot),
            macd: self.macd_vote(snapshot),
        };
        let (action, strength) =
            Self::fuse(&[contributing.sma, contributing.rsi, contributing.macd]);

        CombinedSignal {
            symbol: snapshot.symbol.clone(),
            timeframe: snapshot.timeframe,
            action,
            strength,
            timestamp: snapshot.timestamp,
            contributing,
        }
    }

    /// Close above the SMA is bullish, below is bearish. Confidence is the
    /// normalized distance |close - sma| / sma, capped at 1.
    fn sma_vote(&self, snapshot: &IndicatorSnapshot) -> ElementarySignal {
        let sma = match snapshot.sma {
            Some(sma) => sma.value,
            None => return ElementarySignal::undefined(),
        };

        let action = if snapshot.close > sma {
            SignalAction::Buy
        } else if snapshot.close < sma {
            SignalAction::Sell
        } else {
            SignalAction::Hold
        };
        let confidence = if sma != 0.0 {
            ((snapshot.close - sma).abs() / sma.abs()).min(1.0)
        } else {
            0.0
        };
        ElementarySignal::new(action, confidence)
    }

    /// RSI below the oversold band votes buy, above the overbought band
    /// votes sell. Confidence is the distance from the nearest band edge,
    /// normalized and capped at 1.
    fn rsi_vote(&self, snapshot: &IndicatorSnapshot) -> ElementarySignal {
        let rsi = match snapshot.rsi {
            Some(rsi) => rsi.value,
            None => return ElementarySignal::undefined(),
        };
        let oversold = self.config.rsi_oversold;
        let overbought = self.config.rsi_overbought;

        if rsi < oversold {
            let confidence = (oversold - rsi) / oversold;
            ElementarySignal::new(SignalAction::Buy, confidence)
        } else if rsi > overbought {
            let confidence = (rsi - overbought) / (100.0 - overbought);
            ElementarySignal::new(SignalAction::Sell, confidence)
        } else {
            let half_band = (overbought - oversold) / 2.0;
            let confidence = (rsi - oversold).min(overbought - rsi) / half_band;
            ElementarySignal::new(SignalAction::Hold, confidence)
        }
    }

    /// A histogram sign change votes in the crossing direction. Confidence
    /// is |histogram| over its rolling mean, capped at 1.
    fn macd_vote(&self, snapshot: &IndicatorSnapshot) -> ElementarySignal {
        let macd = match snapshot.macd {
            Some(macd) => macd,
            None => return ElementarySignal::undefined(),
        };

        let action = match macd.cross {
            Some(CrossDirection::Bullish) => SignalAction::Buy,
            Some(CrossDirection::Bearish) => SignalAction::Sell,
            None => SignalAction::Hold,
        };
        let confidence = if macd.histogram_scale > 0.0 {
            (macd.histogram.abs() / macd.histogram_scale).min(1.0)
        } else {
            0.0
        };
        ElementarySignal::new(action, confidence)
    }

    /// Majority fusion with explicit deadlock resolution.
    ///
    /// Two or more matching non-hold votes win with the mean confidence of
    /// the agreeing votes. A buy and a sell present together, or a single
    /// non-hold vote, resolve to hold with zero strength.
    fn fuse(votes: &[ElementarySignal; 3]) -> (SignalAction, f64) {
        let buys: Vec<&ElementarySignal> = votes
            .iter()
            .filter(|v| v.action == SignalAction::Buy)
            .collect();
        let sells: Vec<&ElementarySignal> = votes
            .iter()
            .filter(|v| v.action == SignalAction::Sell)
            .collect();

        if !buys.is_empty() && !sells.is_empty() {
            return (SignalAction::Hold, 0.0);
        }
        if buys.len() >= 2 {
            return (SignalAction::Buy, Self::mean_confidence(&buys));
        }
        if sells.len() >= 2 {
            return (SignalAction::Sell, Self::mean_confidence(&sells));
        }
        (SignalAction::Hold, 0.0)
    }

    fn mean_confidence(votes: &[&ElementarySignal]) -> f64 {
        votes.iter().map(|v| v.confidence).sum::<f64>() / votes.len() as f64
    }
}

impl Default for SignalCombiner {
    fn default() -> Self {
        Self::new(CombinerConfig::default())
    }
}
