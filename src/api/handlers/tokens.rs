//! Token allocation and tail query handlers.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{NextTokenRequest, NextTokenResponse, TailsRequest, TailsResponse};
use crate::core::{SequencerError, TokenRequest};
use crate::server::AppState;

/// POST /api/v1/token - Allocate log addresses, or query tails when
/// `num_tokens` is 0.
pub async fn next_token(
    State(state): State<AppState>,
    Json(req): Json<NextTokenRequest>,
) -> Result<Json<NextTokenResponse>, ApiError> {
    let issued = req.num_tokens > 0;
    let result = state
        .sequencer
        .next_token(TokenRequest {
            streams: req.stream_ids,
            num_tokens: req.num_tokens,
            epoch: req.epoch,
            resolution: req.resolution,
        })
        .await;

    match result {
        Ok(token) => {
            if issued {
                state.metrics.record_token_issued();
            } else {
                state.metrics.record_tail_query();
            }
            Ok(Json(NextTokenResponse {
                global_address: token.global_address,
                stream_tails: token.stream_tails,
                epoch: token.epoch,
            }))
        }
        Err(err) => {
            record_rejection(&state, &err);
            Err(err.into())
        }
    }
}

/// POST /api/v1/tails - Pure tail query.
pub async fn tails(
    State(state): State<AppState>,
    Json(req): Json<TailsRequest>,
) -> Result<Json<TailsResponse>, ApiError> {
    let result = state
        .sequencer
        .tails(req.epoch, req.stream_ids.as_deref())
        .await;

    match result {
        Ok(snapshot) => {
            state.metrics.record_tail_query();
            Ok(Json(TailsResponse {
                log_tail: snapshot.log_tail,
                stream_tails: snapshot.stream_tails,
            }))
        }
        Err(err) => {
            record_rejection(&state, &err);
            Err(err.into())
        }
    }
}

pub(crate) fn record_rejection(state: &AppState, err: &SequencerError) {
    match err {
        SequencerError::WrongEpoch { .. } | SequencerError::StaleEpoch { .. } => {
            state.metrics.record_wrong_epoch()
        }
        SequencerError::Conflict { .. } => state.metrics.record_conflict(),
        SequencerError::SnapshotExpired { .. } => state.metrics.record_snapshot_expired(),
        SequencerError::InvalidTrimMark { .. } => {}
    }
}
