//! Environment-based configuration.
//!
//! One explicit `Config` object is built at startup and handed to each
//! component; nothing reads ambient globals after that.

use std::env;
use std::time::Duration;

use crate::indicators::engine::IndicatorConfig;
use crate::services::fetcher::RetryConfig;
use crate::services::session::SessionConfig;
use crate::signals::combiner::CombinerConfig;

/// Deployment environment, from `ENVIRONMENT` (defaults to "sandbox").
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub indicators: IndicatorConfig,
    pub combiner: CombinerConfig,
    pub retry: RetryConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Build the configuration from environment variables, falling back
    /// to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        config.indicators.sma_period = env_usize("SMA_PERIOD", config.indicators.sma_period);
        config.indicators.rsi_period = env_usize("RSI_PERIOD", config.indicators.rsi_period);
        config.indicators.macd_fast = env_usize("MACD_FAST_PERIOD", config.indicators.macd_fast);
        config.indicators.macd_slow = env_usize("MACD_SLOW_PERIOD", config.indicators.macd_slow);
        config.indicators.macd_signal =
            env_usize("MACD_SIGNAL_PERIOD", config.indicators.macd_signal);

        config.combiner.rsi_oversold = env_f64("RSI_OVERSOLD", config.combiner.rsi_oversold);
        config.combiner.rsi_overbought = env_f64("RSI_OVERBOUGHT", config.combiner.rsi_overbought);

        config.retry.max_attempts = env_usize("FETCH_MAX_ATTEMPTS", config.retry.max_attempts);
        config.retry.base_delay = Duration::from_millis(env_u64(
            "FETCH_RETRY_BASE_MS",
            config.retry.base_delay.as_millis() as u64,
        ));
        config.retry.max_delay = Duration::from_millis(env_u64(
            "FETCH_RETRY_CAP_MS",
            config.retry.max_delay.as_millis() as u64,
        ));

        config.session.poll_interval = Duration::from_secs(env_u64(
            "POLL_INTERVAL_SECS",
            config.session.poll_interval.as_secs(),
        ));

        config
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
