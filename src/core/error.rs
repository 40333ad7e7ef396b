//! Error types for the sequencer core.

use thiserror::Error;

use crate::domain::{Address, Epoch, StreamId, TxId};

/// Typed failures returned across the sequencer's request boundary.
///
/// All variants are recoverable by the client (retry with updated
/// parameters, or restart the transaction); none require server-side retry.
/// Internal invariant violations are not represented here: state corruption
/// aborts the process instead of surfacing as a recoverable error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequencerError {
    /// Request epoch does not match the currently accepted epoch.
    #[error("wrong epoch: request carried {request}, sequencer is at {current}")]
    WrongEpoch { request: Epoch, current: Epoch },

    /// The transaction's read/write set intersects a commit that postdates
    /// its snapshot.
    #[error("transaction {tx} conflicts on stream {stream}")]
    Conflict { tx: TxId, stream: StreamId },

    /// The transaction's snapshot predates the window's retained floor, so
    /// the absence of a conflict can no longer be proven.
    #[error("snapshot {snapshot} predates conflict window floor {floor}")]
    SnapshotExpired { snapshot: Address, floor: Address },

    /// Requested trim mark is behind the current one or beyond the global
    /// tail.
    #[error("invalid trim mark: requested {requested}, current {current}")]
    InvalidTrimMark { requested: Address, current: Address },

    /// Reset epoch is not strictly greater than the current epoch.
    #[error("stale epoch on reset: requested {requested}, current {current}")]
    StaleEpoch { requested: Epoch, current: Epoch },
}

/// Result type for sequencer operations.
pub type Result<T> = std::result::Result<T, SequencerError>;
