//! HTTP API layer for the sequencer.

pub mod error;
pub mod handlers;
mod rest;
pub mod types;

pub use error::{ApiError, ErrorCode};
pub use rest::router;
