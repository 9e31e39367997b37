//! HTTP/WebSocket edge using Axum.
//!
//! The transport layer stops here: handlers parse subscription
//! parameters, bridge the socket to a [`StreamingSession`], and expose
//! health and metrics. No engine logic lives in this module.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, Request, State,
    },
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures_util::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::config::Config;
use crate::indicators::engine::IndicatorEngine;
use crate::metrics::Metrics;
use crate::models::bar::Timeframe;
use crate::models::signal::StreamUpdate;
use crate::services::fetcher::RetryingFetcher;
use crate::services::market_data::BarSource;
use crate::services::session::{
    BroadcastClosed, Broadcaster, SessionRequest, StreamingSession,
};
use crate::signals::combiner::SignalCombiner;

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub source: Arc<dyn BarSource>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>, source: Arc<dyn BarSource>, config: Arc<Config>) -> Self {
        Self {
            metrics,
            start_time: Arc::new(Instant::now()),
            source,
            config,
        }
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Marketpulse Signal API!"
    }))
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Json(json!({
        "status": "healthy",
        "uptime_seconds": uptime_seconds,
        "service": "marketpulse-signal-engine"
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    state.metrics.http_requests_in_flight.dec();

    state
        .metrics
        .http_requests_total
        .with_label_values(&[method.as_str(), path.as_str(), response.status().as_str()])
        .inc();
    response
}

/// Query parameters of the streaming subscription endpoint.
///
/// `symbol` and `symbols` are interchangeable; `symbols` takes a
/// comma-separated list.
#[derive(Debug, Deserialize)]
pub struct SignalStreamParams {
    pub symbol: Option<String>,
    pub symbols: Option<String>,
    pub timeframe: Option<String>,
    pub num_bars: Option<usize>,
}

impl SignalStreamParams {
    fn symbols(&self) -> Vec<String> {
        let raw = self
            .symbols
            .clone()
            .or_else(|| self.symbol.clone())
            .unwrap_or_else(|| "EURUSD".to_string());
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// WebSocket subscription endpoint.
///
/// Invalid timeframes are rejected with 400 before the upgrade; all later
/// failures are session-level and end with a close frame.
pub async fn ws_signal(
    ws: WebSocketUpgrade,
    Query(params): Query<SignalStreamParams>,
    State(state): State<AppState>,
) -> Response {
    let timeframe = match params
        .timeframe
        .as_deref()
        .unwrap_or("M1")
        .parse::<Timeframe>()
    {
        Ok(timeframe) => timeframe,
        Err(err) => return (StatusCode::BAD_REQUEST, err).into_response(),
    };

    let request = SessionRequest {
        symbols: params.symbols(),
        timeframe,
        num_bars: params.num_bars.unwrap_or(100),
    };

    ws.on_upgrade(move |socket| handle_signal_socket(socket, request, state))
}

async fn handle_signal_socket(socket: WebSocket, request: SessionRequest, state: AppState) {
    let (sink, mut stream) = socket.split();

    // Reader task: its only job is to notice the client going away and
    // trip the session's shutdown signal.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reader = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
        let _ = shutdown_tx.send(true);
    });

    let fetcher = RetryingFetcher::new(state.source.clone(), state.config.retry.clone())
        .with_metrics(state.metrics.clone());
    let engine = IndicatorEngine::new(state.config.indicators.clone());
    let combiner = SignalCombiner::new(state.config.combiner.clone());
    let mut session = StreamingSession::new(
        request,
        fetcher,
        engine,
        combiner,
        state.config.session.clone(),
    )
    .with_metrics(state.metrics.clone());

    let mut broadcaster = WebSocketBroadcaster { sink };
    if let Err(err) = session.run(&mut broadcaster, shutdown_rx).await {
        warn!(error = %err, "streaming session ended with error");
        let close = Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: err.to_string().into(),
        }));
        let _ = broadcaster.sink.send(close).await;
    }
    reader.abort();
}

struct WebSocketBroadcaster {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait::async_trait]
impl Broadcaster for WebSocketBroadcaster {
    async fn emit(&mut self, update: StreamUpdate) -> Result<(), BroadcastClosed> {
        let payload = serde_json::to_string(&update).map_err(|_| BroadcastClosed)?;
        self.sink
            .send(Message::Text(payload.into()))
            .await
            .map_err(|_| BroadcastClosed)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/ws/signal", get(ws_signal))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                ),
        )
        .with_state(state)
}

pub async fn start_server(
    port: u16,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port = port, "HTTP server listening on 0.0.0.0:{}", port);
    axum::serve(listener, router).await?;
    Ok(())
}
