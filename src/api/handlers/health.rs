//! Liveness and readiness endpoints.

use axum::extract::State;
use axum::Json;

use crate::server::AppState;

/// GET /health - Liveness check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "streamlog-sequencer",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /ready - Readiness check; reports the serving epoch.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let epoch = state.sequencer.current_epoch().await;
    Json(serde_json::json!({
        "status": "ready",
        "epoch": epoch,
    }))
}
