//! Per-subscription streaming session.
//!
//! State machine: INIT -> STREAMING -> (CLOSED | FAILED). Each session
//! runs as one task, owns its indicator state, and suspends only at the
//! fetch call and the inter-cycle delay; both are raced against the
//! shutdown signal so cancellation is observed promptly and never leaves
//! a partial indicator update behind.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::indicators::engine::{IndicatorEngine, UpdateOutcome};
use crate::metrics::Metrics;
use crate::models::bar::{Bar, Timeframe};
use crate::models::signal::{CombinedSignal, StreamUpdate, SymbolUpdate};
use crate::services::fetcher::RetryingFetcher;
use crate::services::market_data::{BarSource, FetchError};
use crate::signals::combiner::SignalCombiner;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no symbols requested")]
    NoSymbols,
    #[error("symbol names must not be empty")]
    EmptySymbol,
    #[error("num_bars must be a positive integer")]
    InvalidBarCount,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("initial fetch failed for {symbol}: {source}")]
    InitialFetch {
        symbol: String,
        #[source]
        source: FetchError,
    },
    #[error("all symbol lanes failed")]
    AllLanesFailed,
}

/// The subscriber went away; emissions can no longer be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("broadcast channel closed")]
pub struct BroadcastClosed;

/// Sink for per-cycle stream updates (the transport boundary).
#[async_trait]
pub trait Broadcaster: Send {
    async fn emit(&mut self, update: StreamUpdate) -> Result<(), BroadcastClosed>;
}

/// Parameters of one streaming subscription.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    /// Size of the initial bar window used to seed the indicators.
    pub num_bars: usize,
}

impl SessionRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbols.is_empty() {
            return Err(ValidationError::NoSymbols);
        }
        if self.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(ValidationError::EmptySymbol);
        }
        if self.num_bars == 0 {
            return Err(ValidationError::InvalidBarCount);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Streaming,
    Closed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// One symbol's fetch/compute lane inside a session.
struct SymbolLane {
    symbol: String,
    last_signal: Option<CombinedSignal>,
    /// Set when the lane failed terminally; reported in-stream while the
    /// remaining lanes keep going.
    error: Option<String>,
}

pub struct StreamingSession<S> {
    request: SessionRequest,
    fetcher: RetryingFetcher<S>,
    engine: IndicatorEngine,
    combiner: SignalCombiner,
    config: SessionConfig,
    metrics: Option<Arc<Metrics>>,
    state: SessionState,
    lanes: Vec<SymbolLane>,
}

impl<S: BarSource> StreamingSession<S> {
    pub fn new(
        request: SessionRequest,
        fetcher: RetryingFetcher<S>,
        engine: IndicatorEngine,
        combiner: SignalCombiner,
        config: SessionConfig,
    ) -> Self {
        Self {
            request,
            fetcher,
            engine,
            combiner,
            config,
            metrics: None,
            state: SessionState::Init,
            lanes: Vec::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session until the subscriber disconnects or it fails.
    ///
    /// Nothing is emitted unless INIT succeeds for every symbol: an
    /// unknown symbol or other terminal fetch failure at startup ends the
    /// session without a single message.
    pub async fn run<B: Broadcaster>(
        &mut self,
        broadcaster: &mut B,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SessionError> {
        if let Err(err) = self.request.validate() {
            self.state = SessionState::Failed;
            return Err(err.into());
        }

        for symbol in self.request.symbols.clone() {
            if shutdown_requested(&mut shutdown) {
                self.finish(SessionState::Closed, false);
                return Ok(());
            }
            if let Err(source) = self.seed_lane(&symbol).await {
                self.state = SessionState::Failed;
                return Err(SessionError::InitialFetch { symbol, source });
            }
        }

        self.state = SessionState::Streaming;
        if let Some(metrics) = &self.metrics {
            metrics.sessions_started_total.inc();
            metrics.sessions_active.inc();
        }
        info!(
            symbols = ?self.request.symbols,
            timeframe = %self.request.timeframe,
            num_bars = self.request.num_bars,
            "streaming session started"
        );

        loop {
            let update = self.build_update();
            if broadcaster.emit(update).await.is_err() {
                debug!("subscriber gone, closing session");
                self.finish(SessionState::Closed, true);
                return Ok(());
            }
            if let Some(metrics) = &self.metrics {
                metrics.signals_emitted_total.inc();
            }

            if self.lanes.iter().all(|lane| lane.error.is_some()) {
                self.finish(SessionState::Failed, true);
                return Err(SessionError::AllLanesFailed);
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    // A closed sender also means the subscriber is gone.
                    let _ = changed;
                    self.finish(SessionState::Closed, true);
                    return Ok(());
                }
                _ = sleep(self.config.poll_interval) => {}
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    let _ = changed;
                    self.finish(SessionState::Closed, true);
                    return Ok(());
                }
                _ = self.poll_cycle() => {}
            }
        }
    }

    /// Fetch the initial window for one symbol and seed its lane.
    async fn seed_lane(&mut self, symbol: &str) -> Result<(), FetchError> {
        let bars = self
            .fetcher
            .fetch(symbol, self.request.timeframe, self.request.num_bars)
            .await?;

        self.lanes.push(SymbolLane {
            symbol: symbol.to_string(),
            last_signal: None,
            error: None,
        });
        let lane_index = self.lanes.len() - 1;
        self.apply_bars(lane_index, &bars);
        Ok(())
    }

    /// One STREAMING cycle: refresh every healthy lane.
    async fn poll_cycle(&mut self) {
        for index in 0..self.lanes.len() {
            if self.lanes[index].error.is_some() {
                continue;
            }
            let symbol = self.lanes[index].symbol.clone();
            match self
                .fetcher
                .fetch(&symbol, self.request.timeframe, self.request.num_bars)
                .await
            {
                // Bars at or before the last applied timestamp are dropped
                // by the engine, so overlapping windows are harmless.
                Ok(bars) => self.apply_bars(index, &bars),
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "symbol lane failed");
                    self.lanes[index].error = Some(err.to_string());
                }
            }
        }
    }

    /// Apply bars in order; a combined signal is produced for every bar
    /// that advances the state.
    fn apply_bars(&mut self, lane_index: usize, bars: &[Bar]) {
        let timeframe = self.request.timeframe;
        let symbol = self.lanes[lane_index].symbol.clone();
        for bar in bars {
            if let UpdateOutcome::Applied(snapshot) = self.engine.update(&symbol, timeframe, bar)
            {
                self.lanes[lane_index].last_signal = Some(self.combiner.combine(&snapshot));
            }
        }
    }

    fn build_update(&self) -> StreamUpdate {
        let mut signals = BTreeMap::new();
        for lane in &self.lanes {
            let entry = if let Some(message) = &lane.error {
                SymbolUpdate::Error {
                    message: message.clone(),
                }
            } else if let Some(signal) = &lane.last_signal {
                SymbolUpdate::Signal {
                    signal: signal.clone(),
                    timestamp: signal.timestamp,
                }
            } else {
                SymbolUpdate::Error {
                    message: format!("no data available for {}", lane.symbol),
                }
            };
            signals.insert(lane.symbol.clone(), entry);
        }
        StreamUpdate {
            timestamp: Utc::now(),
            signals,
        }
    }

    fn finish(&mut self, state: SessionState, was_streaming: bool) {
        self.state = state;
        let timeframe = self.request.timeframe;
        let symbols: Vec<String> = self.lanes.iter().map(|lane| lane.symbol.clone()).collect();
        for symbol in symbols {
            self.engine.release(&symbol, timeframe);
        }
        if was_streaming {
            if let Some(metrics) = &self.metrics {
                metrics.sessions_active.dec();
            }
        }
        info!(state = ?self.state, "streaming session ended");
    }
}

fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) -> bool {
    *shutdown.borrow_and_update()
}
