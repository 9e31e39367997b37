//! Shared data models spanning the engine layers.

pub mod bar;
pub mod indicators;
pub mod signal;

pub use bar::{Bar, Timeframe};
pub use indicators::{
    CrossDirection, IndicatorSnapshot, MacdIndicator, RsiIndicator, SmaIndicator,
};
pub use signal::{
    CombinedSignal, ContributingSignals, ElementarySignal, SignalAction, StreamUpdate,
    SymbolUpdate,
};
