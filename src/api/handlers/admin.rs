//! Trim, reset and metrics handlers.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{AckResponse, ResetRequest, TrimMarkRequest};
use crate::metrics::ServerMetrics;
use crate::server::AppState;

use super::tokens::record_rejection;

/// POST /api/v1/trim - Advance the trim mark and evict covered conflict
/// history.
pub async fn trim_mark(
    State(state): State<AppState>,
    Json(req): Json<TrimMarkRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    match state.sequencer.trim_mark(req.epoch, req.mark).await {
        Ok(()) => {
            state.metrics.record_trim();
            Ok(Json(AckResponse { epoch: req.epoch }))
        }
        Err(err) => {
            record_rejection(&state, &err);
            Err(err.into())
        }
    }
}

/// POST /api/v1/reset - Install a fresh sequencer state for a strictly
/// newer epoch.
pub async fn reset(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    match state.sequencer.reset(req.new_epoch, req.resync).await {
        Ok(()) => {
            state.metrics.record_reset();
            Ok(Json(AckResponse { epoch: req.new_epoch }))
        }
        Err(err) => {
            record_rejection(&state, &err);
            Err(err.into())
        }
    }
}

/// GET /api/v1/metrics - Counters and internal gauges for the monitoring
/// collaborator.
pub async fn server_metrics(State(state): State<AppState>) -> Json<ServerMetrics> {
    Json(ServerMetrics {
        endpoint: state.endpoint.clone(),
        sequencer: state.sequencer.status().await,
        counters: state.metrics.snapshot(),
    })
}
