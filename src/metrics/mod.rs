//! Prometheus metrics for the signal service.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub sessions_active: IntGauge,
    pub sessions_started_total: IntCounter,
    pub signals_emitted_total: IntCounter,
    pub fetch_retries_total: IntCounter,
    pub fetch_failures_total: IntCounter,
    pub http_requests_total: IntCounterVec,
    pub http_requests_in_flight: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let sessions_active = IntGauge::new(
            "signal_sessions_active",
            "Number of streaming sessions currently running",
        )?;
        let sessions_started_total = IntCounter::new(
            "signal_sessions_started_total",
            "Total streaming sessions started",
        )?;
        let signals_emitted_total = IntCounter::new(
            "signal_updates_emitted_total",
            "Total stream updates emitted to subscribers",
        )?;
        let fetch_retries_total = IntCounter::new(
            "bar_fetch_retries_total",
            "Total transient fetch failures that were retried",
        )?;
        let fetch_failures_total = IntCounter::new(
            "bar_fetch_failures_total",
            "Total fetches that failed terminally",
        )?;
        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_requests_in_flight = IntGauge::new(
            "http_requests_in_flight",
            "HTTP requests currently being served",
        )?;

        registry.register(Box::new(sessions_active.clone()))?;
        registry.register(Box::new(sessions_started_total.clone()))?;
        registry.register(Box::new(signals_emitted_total.clone()))?;
        registry.register(Box::new(fetch_retries_total.clone()))?;
        registry.register(Box::new(fetch_failures_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;

        Ok(Self {
            registry,
            sessions_active,
            sessions_started_total,
            signals_emitted_total,
            fetch_retries_total,
            fetch_failures_total,
            http_requests_total,
            http_requests_in_flight,
        })
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
