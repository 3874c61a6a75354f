//! Status and health routes.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::api::server::AppState;
use crate::metrics::HealthStatus;

/// `GET /` body.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub source: String,
    /// RFC 3339 time of the last finished cycle.
    pub last_check: Option<String>,
    /// Check interval in minutes.
    pub interval: u64,
}

/// `GET /health` body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub relay: HealthStatus,
    pub bot_ready: bool,
    pub uptime_secs: u64,
    pub version: &'static str,
    pub cycles: u64,
    pub deliveries: u64,
    pub failures: u64,
    pub last_delivered_id: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
}

/// Relay status summary.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let health = &state.health;
    Json(StatusResponse {
        status: "running",
        source: health.source().to_string(),
        last_check: health.last_check().map(|t| t.to_rfc3339()),
        interval: health.check_interval().as_secs() / 60,
    })
}

/// Health check endpoint.
///
/// Always 200 while the process is up; cycle failures show in `relay` and
/// `last_error` instead of failing the check.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.health.snapshot();
    Json(HealthResponse {
        status: "healthy",
        relay: snapshot.status,
        bot_ready: snapshot.destination_ready,
        uptime_secs: snapshot.uptime_secs,
        version: env!("CARGO_PKG_VERSION"),
        cycles: snapshot.cycles,
        deliveries: snapshot.deliveries,
        failures: snapshot.failures,
        last_delivered_id: snapshot.last_delivered_id,
        last_error: snapshot.last_error,
    })
}

async fn liveness_check(State(state): State<AppState>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive",
        uptime_secs: state.health.uptime().as_secs(),
    })
}
