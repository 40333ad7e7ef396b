//! Streamlog Sequencer Library
//!
//! Ordering and conflict-resolution authority for a distributed shared
//! append-only log: issues globally and per-stream monotonic addresses,
//! adjudicates optimistic transactions against a bounded window of
//! committed write sets, and fences stale requests across epoch changes.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (addresses, streams, tokens, conflict sets)
//! - [`core`] - The sequencer itself (epoch gate, tail tracker, conflict window)
//! - [`wire`] - Binary wire codec for the request/response payloads
//! - [`metrics`] - Request counters and the server-metrics report
//! - [`api`] - REST API routes
//! - [`server`] - HTTP server bootstrap

pub mod api;
pub mod core;
pub mod domain;
pub mod metrics;
pub mod server;
pub mod wire;

// Re-export commonly used types
pub use core::{Result, Sequencer, SequencerConfig, SequencerError, TokenRequest};
pub use domain::{
    Address, ConflictParameter, ConflictSet, Epoch, StreamId, TailResync, TailsSnapshot, Token,
    TxId, TxResolutionInfo, NON_ADDRESS,
};
