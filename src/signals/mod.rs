//! Signal fusion interfaces.

pub mod combiner;

pub use combiner::{CombinerConfig, SignalCombiner};
