//! Health check handler.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use chathub_realtime::metrics::MetricsSnapshot;

use crate::state::AppState;

/// Body of GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Live topic record count.
    pub topics: usize,
    /// Engine counters.
    pub metrics: MetricsSnapshot,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        topics: state.engine.registry.topic_count().await,
        metrics: state.engine.metrics.snapshot(),
    })
}
