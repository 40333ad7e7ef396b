//! Core domain types for the stream-log sequencer.

mod token;
mod types;

pub use token::{ConflictSet, TailResync, TailsSnapshot, Token, TxResolutionInfo};
pub use types::{bytes_hex, Address, ConflictParameter, Epoch, StreamId, TxId, NON_ADDRESS};
