//! Token and transaction-resolution payloads.
//!
//! A [`Token`] is the result of an address allocation: the first reserved
//! global address plus, for every requested stream, that stream's tail after
//! the allocation. [`TxResolutionInfo`] carries what the conflict window
//! needs to adjudicate an optimistic transaction.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::types::{Address, ConflictParameter, Epoch, StreamId, TxId};

/// Per-stream sets of conflict parameters, keyed by stream.
pub type ConflictSet = HashMap<StreamId, HashSet<ConflictParameter>>;

/// An allocated position in the global log.
///
/// `global_address` is the first address of the reserved range; a request
/// for `n` tokens owns `[global_address, global_address + n)`. Each entry in
/// `stream_tails` is the stream's tail after this allocation, i.e. the last
/// reserved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub global_address: Address,
    pub stream_tails: HashMap<StreamId, Address>,
    pub epoch: Epoch,
}

/// What a transaction asks the conflict window to validate: the snapshot it
/// read from and the conflict parameters it read and intends to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResolutionInfo {
    pub tx_id: TxId,
    /// The global sequence the transaction read from. `NON_ADDRESS` means
    /// the transaction started against an empty log.
    pub snapshot_sequence: Address,
    #[serde(default)]
    pub write_conflicts: ConflictSet,
    #[serde(default)]
    pub read_conflicts: ConflictSet,
}

impl TxResolutionInfo {
    pub fn new(snapshot_sequence: Address) -> Self {
        Self {
            tx_id: TxId::new(),
            snapshot_sequence,
            write_conflicts: ConflictSet::new(),
            read_conflicts: ConflictSet::new(),
        }
    }

    pub fn with_write(mut self, stream: StreamId, params: impl IntoIterator<Item = ConflictParameter>) -> Self {
        self.write_conflicts.entry(stream).or_default().extend(params);
        self
    }

    pub fn with_read(mut self, stream: StreamId, params: impl IntoIterator<Item = ConflictParameter>) -> Self {
        self.read_conflicts.entry(stream).or_default().extend(params);
        self
    }
}

/// A point-in-time view of the log tail and a set of stream tails, as
/// returned by a pure tails query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailsSnapshot {
    pub log_tail: Address,
    pub stream_tails: HashMap<StreamId, Address>,
}

/// Durable tail state recovered from the storage layer, used to seed a
/// fresh sequencer state on reset after failover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailResync {
    pub global_tail: Address,
    #[serde(default)]
    pub stream_tails: HashMap<StreamId, Address>,
}

impl TailResync {
    pub fn new(global_tail: Address, stream_tails: HashMap<StreamId, Address>) -> Self {
        Self {
            global_tail,
            stream_tails,
        }
    }
}
