//! Driving Telemetry API Server
//!
//! REST API for recording driving sessions, browsing their history and
//! querying event hotspots.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use hotspot::HotspotService;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use session::{CompletedSession, SessionAggregator, SessionStatus};
use tokio::sync::Mutex;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod backends;
pub mod config;
pub mod error;
pub mod rate_limit;
mod recorder;
mod routes;

pub use backends::{Publisher, Store};
pub use config::{AppConfig, ConfigError, LoggingConfig};
pub use error::ApiError;

use rate_limit::create_governor_config;

/// Application state shared across handlers
pub struct AppState {
    pub config: AppConfig,
    /// Session state machine for this device
    pub recorder: Mutex<SessionAggregator>,
    /// Stopped sessions whose commit failed, oldest first
    pub pending: Mutex<Vec<CompletedSession>>,
    pub store: Store,
    pub publisher: Publisher,
    pub hotspots: HotspotService<Store>,
    /// Prometheus render handle, absent when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
    pub version: String,
    pub start_time: Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: AppConfig, store: Store, publisher: Publisher, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            recorder: Mutex::new(SessionAggregator::new(config.session_config())),
            pending: Mutex::new(Vec::new()),
            hotspots: HotspotService::new(store.clone()),
            config,
            store,
            publisher,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    /// Open the configured backends
    pub async fn from_config(config: AppConfig, metrics: Option<PrometheusHandle>) -> Result<Self, Box<dyn std::error::Error>> {
        let store = Store::open(&config.storage).await?;
        let publisher = Publisher::from_config(&config.cloud).await?;
        Ok(Self::new(config, store, publisher, metrics))
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub session: SessionStatus,
    pub pending_sessions: usize,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub storage: String,
    pub cloud: String,
}

/// Create the application router
pub fn create_router(state: SharedState) -> Result<Router, ConfigError> {
    let governor = create_governor_config(&state.config.rate_limit)?;

    let hotspots = Router::new()
        .route("/api/v1/hotspots", get(routes::hotspots::get_hotspots))
        .layer(GovernorLayer { config: governor });

    Ok(Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/session", get(routes::session::get_status))
        .route("/api/v1/session/start", post(routes::session::start))
        .route("/api/v1/session/pause", post(routes::session::pause))
        .route("/api/v1/session/resume", post(routes::session::resume))
        .route("/api/v1/session/stop", post(routes::session::stop))
        .route("/api/v1/session/discard", post(routes::session::discard))
        .route("/api/v1/session/flush", post(routes::session::flush))
        .route("/api/v1/session/samples", post(routes::session::post_samples))
        .route("/api/v1/session/motion", post(routes::session::post_motion))
        .route("/api/v1/session/fixes", post(routes::session::post_fixes))
        .route("/api/v1/sessions", get(routes::history::list_sessions))
        .route("/api/v1/sessions/:id/events", get(routes::history::get_events))
        .route("/api/v1/sessions/:id/samples", get(routes::history::get_samples))
        .route("/api/v1/sessions/:id/track", get(routes::history::get_track))
        .route("/api/v1/profile", get(routes::profile::get_profile))
        .merge(hotspots)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state))
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let session = state.recorder.lock().await.status();
    let pending_sessions = state.pending.lock().await.len();

    Json(HealthResponse {
        status: if pending_sessions == 0 { "healthy" } else { "degraded" }.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        session,
        pending_sessions,
        components: ComponentStatus {
            storage: state.store.backend_name().to_string(),
            cloud: match state.publisher {
                Publisher::Mqtt(_) => "mqtt".to_string(),
                Publisher::Disabled(_) => "disabled".to_string(),
            },
        },
    })
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<SharedState>) -> String {
    state.metrics.as_ref().map(|h| h.render()).unwrap_or_default()
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), SetGlobalDefaultError> {
    let level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

/// Install the global Prometheus recorder and describe the counters
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            metrics::describe_counter!("telemetry_samples_total", "Motion samples accepted for classification");
            metrics::describe_counter!("telemetry_events_total", "Driving events detected, by type");
            metrics::describe_counter!("telemetry_sessions_completed_total", "Sessions stopped and persisted");
            Some(handle)
        }
        Err(e) => {
            warn!("Metrics recorder not installed: {}", e);
            None
        }
    }
}

/// Run the server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.server.bind_addr.clone();
    let state = Arc::new(AppState::from_config(config, init_metrics()).await?);
    let app = create_router(state)?;

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
