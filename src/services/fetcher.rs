//! Retrying wrapper around a [`BarSource`].
//!
//! Transient failures are retried with bounded exponential backoff;
//! permanent failures surface immediately. After exhausting the attempt
//! budget, the last underlying error is returned.

use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::metrics::Metrics;
use crate::models::bar::{Bar, Timeframe};
use crate::services::market_data::{BarSource, FetchError};

/// Retry policy for upstream fetches.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first (must be at least 1).
    pub max_attempts: usize,
    /// Delay before the first retry; doubles each attempt.
    pub base_delay: Duration,
    /// Backoff cap.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

pub struct RetryingFetcher<S> {
    source: S,
    config: RetryConfig,
    metrics: Option<Arc<Metrics>>,
}

impl<S: BarSource> RetryingFetcher<S> {
    pub fn new(source: S, config: RetryConfig) -> Self {
        Self {
            source,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetch the most recent `count` bars, retrying transient failures.
    pub async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, FetchError> {
        let backoff = ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(self.config.base_delay)
            .with_max_delay(self.config.max_delay)
            .with_max_times(self.config.max_attempts.saturating_sub(1));

        let result = (|| async { self.source.fetch(symbol, timeframe, count).await })
            .retry(backoff)
            .when(FetchError::is_transient)
            .notify(|err: &FetchError, delay: Duration| {
                if let Some(metrics) = &self.metrics {
                    metrics.fetch_retries_total.inc();
                }
                warn!(
                    symbol = %symbol,
                    timeframe = %timeframe,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient fetch failure, retrying"
                );
            })
            .await;

        if result.is_err() {
            if let Some(metrics) = &self.metrics {
                metrics.fetch_failures_total.inc();
            }
        }
        result
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
