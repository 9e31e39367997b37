//! Incremental technical indicators.

pub mod engine;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use engine::{IndicatorConfig, IndicatorEngine, IndicatorState, UpdateOutcome};
pub use macd::{Ema, Macd, MacdOutput};
pub use rsi::Rsi;
pub use sma::Sma;
