//! Stream tail tracking and the global address counter.

use std::collections::HashMap;

use crate::domain::{Address, StreamId, TailsSnapshot, Token, NON_ADDRESS};

/// Maps each stream to the highest address ever allocated to it, and holds
/// the single global tail counter.
#[derive(Debug, Clone, Default)]
pub struct StreamTailTracker {
    global_tail: Address,
    stream_tails: HashMap<StreamId, Address>,
}

impl StreamTailTracker {
    /// An empty tracker: no log entries, no stream tails.
    pub fn new() -> Self {
        Self {
            global_tail: NON_ADDRESS,
            stream_tails: HashMap::new(),
        }
    }

    /// Seed the tracker from tails recovered out of durable storage.
    pub fn from_resync(global_tail: Address, stream_tails: HashMap<StreamId, Address>) -> Self {
        Self {
            global_tail,
            stream_tails,
        }
    }

    pub fn global_tail(&self) -> Address {
        self.global_tail
    }

    pub fn stream_tail(&self, stream: &StreamId) -> Address {
        self.stream_tails.get(stream).copied().unwrap_or(NON_ADDRESS)
    }

    pub fn stream_count(&self) -> usize {
        self.stream_tails.len()
    }

    /// Reserve `count` consecutive addresses starting at `global_tail + 1`
    /// and move every named stream's tail to the last reserved address.
    ///
    /// Returns the first reserved address and the updated tail of every
    /// named stream.
    pub fn allocate(&mut self, streams: &[StreamId], count: u32) -> (Address, HashMap<StreamId, Address>) {
        debug_assert!(count > 0, "count = 0 is the query-only mode");
        let first = self.global_tail + 1;
        self.global_tail += count as i64;

        let mut tails = HashMap::with_capacity(streams.len());
        for stream in streams {
            self.stream_tails.insert(*stream, self.global_tail);
            tails.insert(*stream, self.global_tail);
        }
        (first, tails)
    }

    /// Pure read of the requested stream tails; `None` returns every stream
    /// currently known. Never mutates state.
    pub fn query(&self, streams: Option<&[StreamId]>) -> TailsSnapshot {
        let stream_tails = match streams {
            Some(ids) => ids
                .iter()
                .map(|id| (*id, self.stream_tail(id)))
                .collect(),
            None => self.stream_tails.clone(),
        };
        TailsSnapshot {
            log_tail: self.global_tail,
            stream_tails,
        }
    }

    /// Query-only token (`count == 0`): current global tail plus the
    /// requested stream tails, no reservation.
    pub fn query_token(&self, streams: &[StreamId], epoch: crate::domain::Epoch) -> Token {
        Token {
            global_address: self.global_tail,
            stream_tails: streams.iter().map(|id| (*id, self.stream_tail(id))).collect(),
            epoch,
        }
    }
}
