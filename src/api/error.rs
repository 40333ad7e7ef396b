//! Structured API error responses with stable error codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::SequencerError;

/// Machine-readable error codes returned by the REST surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Epoch fencing (1xxx)
    /// Request epoch does not match the sequencer's current epoch.
    WrongEpoch,
    /// Reset epoch is not strictly greater than the current epoch.
    StaleEpoch,

    // Transaction resolution (2xxx)
    /// Write/read set intersects a later commit in the retained window.
    TxConflict,
    /// Snapshot predates the window's retained floor.
    SnapshotExpired,

    // Validation (3xxx)
    /// Requested trim mark is behind the current one.
    InvalidTrimMark,
    /// Request body is malformed.
    InvalidRequestBody,

    // Infrastructure (8xxx)
    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::WrongEpoch => 1001,
            ErrorCode::StaleEpoch => 1002,
            ErrorCode::TxConflict => 2001,
            ErrorCode::SnapshotExpired => 2002,
            ErrorCode::InvalidTrimMark => 3001,
            ErrorCode::InvalidRequestBody => 3002,
            ErrorCode::InternalError => 8999,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            // Epoch mismatches are preconditions the client must refresh.
            ErrorCode::WrongEpoch => StatusCode::PRECONDITION_FAILED,
            ErrorCode::StaleEpoch => StatusCode::PRECONDITION_FAILED,
            // Both abort reasons tell the client to restart the tx.
            ErrorCode::TxConflict => StatusCode::CONFLICT,
            ErrorCode::SnapshotExpired => StatusCode::CONFLICT,
            ErrorCode::InvalidTrimMark => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidRequestBody => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            ErrorCode::WrongEpoch => "WRONG_EPOCH",
            ErrorCode::StaleEpoch => "STALE_EPOCH",
            ErrorCode::TxConflict => "TX_CONFLICT",
            ErrorCode::SnapshotExpired => "SNAPSHOT_EXPIRED",
            ErrorCode::InvalidTrimMark => "INVALID_TRIM_MARK",
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", code)
    }
}

/// Structured error body: `{"error": {"code", "numeric_code", "message",
/// "details"?}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self)).into_response()
    }
}

impl From<SequencerError> for ApiError {
    fn from(err: SequencerError) -> Self {
        let message = err.to_string();
        match err {
            SequencerError::WrongEpoch { request, current } => {
                ApiError::new(ErrorCode::WrongEpoch, message).with_details(serde_json::json!({
                    "request_epoch": request,
                    "current_epoch": current,
                }))
            }
            SequencerError::StaleEpoch { requested, current } => {
                ApiError::new(ErrorCode::StaleEpoch, message).with_details(serde_json::json!({
                    "requested_epoch": requested,
                    "current_epoch": current,
                }))
            }
            SequencerError::Conflict { tx, stream } => {
                ApiError::new(ErrorCode::TxConflict, message).with_details(serde_json::json!({
                    "tx_id": tx,
                    "stream_id": stream,
                }))
            }
            SequencerError::SnapshotExpired { snapshot, floor } => {
                ApiError::new(ErrorCode::SnapshotExpired, message).with_details(serde_json::json!({
                    "snapshot": snapshot,
                    "window_floor": floor,
                }))
            }
            SequencerError::InvalidTrimMark { requested, current } => {
                ApiError::new(ErrorCode::InvalidTrimMark, message).with_details(serde_json::json!({
                    "requested": requested,
                    "current": current,
                }))
            }
        }
    }
}
