//! REST API routes for the sequencer.

use axum::routing::{get, post};
use axum::Router;

use crate::server::AppState;

use super::handlers::{admin, tokens};

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/token", post(tokens::next_token))
        .route("/v1/tails", post(tokens::tails))
        .route("/v1/trim", post(admin::trim_mark))
        .route("/v1/reset", post(admin::reset))
        .route("/v1/metrics", get(admin::server_metrics))
}
