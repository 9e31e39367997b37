//! Marketpulse Signal Server
//!
//! Serves the streaming signal WebSocket endpoint plus health check and
//! metrics. Bar data comes from the configured provider behind the
//! BarSource boundary.

use dotenvy::dotenv;
use marketpulse::config::{get_environment, Config};
use marketpulse::core::http::{start_server, AppState};
use marketpulse::logging;
use marketpulse::metrics::Metrics;
use marketpulse::services::market_data::{BarSource, SyntheticBarSource};
use std::env;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let environment = get_environment();
    let config = Arc::new(Config::from_env());

    info!("Starting Marketpulse Signal Server");
    info!(environment = %environment, "Environment");
    info!(port = port, "HTTP Server: http://0.0.0.0:{}", port);

    let metrics = Arc::new(Metrics::new()?);

    let symbols: Vec<String> = env::var("SYMBOLS")
        .ok()
        .map(|s| {
            s.split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let source: Arc<dyn BarSource> = if symbols.is_empty() {
        Arc::new(SyntheticBarSource::default())
    } else {
        info!(symbols = ?symbols, "Using custom symbol universe");
        Arc::new(SyntheticBarSource::new(symbols))
    };

    let state = AppState::new(metrics, source, config);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, state).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("Signal server started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down signal server...");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
