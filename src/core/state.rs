//! The sequencer's state and the token allocation path over it.
//!
//! [`SequencerState`] owns the epoch gate, the tail tracker and the
//! conflict window; [`SequencerState::next_token`] is the atomic
//! reservation algorithm that composes them. The caller (the server) holds
//! the write lock for the whole of a mutating call, so everything in here
//! is plain single-threaded code.

use crate::domain::{
    Address, Epoch, StreamId, TailResync, TailsSnapshot, Token, TxResolutionInfo, NON_ADDRESS,
};

use super::epoch::EpochGate;
use super::error::{Result, SequencerError};
use super::tails::StreamTailTracker;
use super::window::{ConflictWindow, WindowEntry};

/// A token request as received from the dispatch layer.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub streams: Vec<StreamId>,
    /// Number of consecutive addresses to reserve; 0 is the query-only
    /// mode.
    pub num_tokens: u32,
    pub epoch: Epoch,
    pub resolution: Option<TxResolutionInfo>,
}

/// Complete sequencer state: epoch, tails, trim mark and conflict window.
/// Created empty at server start, replaced wholesale on reset.
#[derive(Debug)]
pub struct SequencerState {
    gate: EpochGate,
    tails: StreamTailTracker,
    window: ConflictWindow,
    trim_mark: Address,
}

impl SequencerState {
    pub fn new(epoch: Epoch, window_size: usize) -> Self {
        Self {
            gate: EpochGate::new(epoch),
            tails: StreamTailTracker::new(),
            window: ConflictWindow::new(window_size),
            trim_mark: NON_ADDRESS,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.gate.current()
    }

    pub fn trim_mark(&self) -> Address {
        self.trim_mark
    }

    pub fn global_tail(&self) -> Address {
        self.tails.global_tail()
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn window_floor(&self) -> Address {
        self.window.floor()
    }

    pub fn stream_count(&self) -> usize {
        self.tails.stream_count()
    }

    /// The token allocation path.
    ///
    /// The order is load-bearing: the epoch check touches nothing on
    /// failure; conflict resolution runs against the window as it stood
    /// before this request's own write becomes visible; and the write set
    /// is recorded at exactly the commit sequence the allocation granted.
    pub fn next_token(&mut self, req: &TokenRequest) -> Result<Token> {
        if req.num_tokens == 0 {
            return self.token_query(req);
        }
        self.gate.check(req.epoch)?;

        if let Some(tx) = &req.resolution {
            self.window.resolve(tx)?;
        }

        let (first, stream_tails) = self.tails.allocate(&req.streams, req.num_tokens);

        if let Some(tx) = &req.resolution {
            // The whole reserved range commits when its last address does;
            // comparing later snapshots against the range's end keeps
            // resolution conservative.
            self.window.append(WindowEntry {
                commit_sequence: self.tails.global_tail(),
                write_conflicts: tx.write_conflicts.clone(),
            });
        }

        self.verify();

        Ok(Token {
            global_address: first,
            stream_tails,
            epoch: self.gate.current(),
        })
    }

    /// The query-only side of `next_token` (`num_tokens == 0`): current
    /// global tail plus the requested stream tails, no reservation and no
    /// resolution.
    pub fn token_query(&self, req: &TokenRequest) -> Result<Token> {
        self.gate.check(req.epoch)?;
        Ok(self.tails.query_token(&req.streams, self.gate.current()))
    }

    /// Pure read of the log tail and stream tails at a single consistent
    /// instant.
    pub fn tails(&self, epoch: Epoch, streams: Option<&[StreamId]>) -> Result<TailsSnapshot> {
        self.gate.check(epoch)?;
        Ok(self.tails.query(streams))
    }

    /// Advance the trim mark and evict the window entries it covers.
    /// Re-sending the current mark is an idempotent no-op; moving backward
    /// or past the global tail is rejected without mutation. The upper
    /// bound keeps the window floor at or below the tail, so a later
    /// commit can never land underneath it.
    pub fn trim(&mut self, epoch: Epoch, mark: Address) -> Result<()> {
        self.gate.check(epoch)?;
        if mark < self.trim_mark {
            return Err(SequencerError::InvalidTrimMark {
                requested: mark,
                current: self.trim_mark,
            });
        }
        if mark > self.tails.global_tail() {
            return Err(SequencerError::InvalidTrimMark {
                requested: mark,
                current: self.tails.global_tail(),
            });
        }
        self.trim_mark = mark;
        self.window.trim(mark);
        self.verify();
        Ok(())
    }

    /// Replace this state wholesale for a new epoch.
    ///
    /// With a resync payload the tails are seeded from durable storage and
    /// the window floor starts at the resynced global tail, so any
    /// transaction whose snapshot predates the reset resolves to
    /// `SnapshotExpired` rather than being judged against missing history.
    pub fn reset(&mut self, new_epoch: Epoch, resync: Option<TailResync>, window_size: usize) -> Result<()> {
        self.gate.reset(new_epoch)?;

        let (tails, floor) = match resync {
            Some(resync) => (
                StreamTailTracker::from_resync(resync.global_tail, resync.stream_tails),
                resync.global_tail,
            ),
            None => (StreamTailTracker::new(), NON_ADDRESS),
        };
        self.tails = tails;
        self.window = ConflictWindow::with_floor(window_size, floor);
        self.trim_mark = floor;
        self.verify();
        Ok(())
    }

    /// State corruption check, run after every mutation. A violation here
    /// means the ordering guarantee can no longer be trusted, so the
    /// process aborts instead of attempting a local repair.
    fn verify(&self) {
        let global = self.tails.global_tail();
        let snapshot = self.tails.query(None);
        for (stream, tail) in &snapshot.stream_tails {
            assert!(
                *tail <= global,
                "stream {stream} tail {tail} exceeds global tail {global}"
            );
        }
        if let (Some(oldest), Some(newest)) = (self.window.oldest_commit(), self.window.newest_commit()) {
            assert!(
                oldest > self.window.floor(),
                "window retains entry {oldest} at or below floor {}",
                self.window.floor()
            );
            assert!(
                newest <= global,
                "window entry {newest} beyond global tail {global}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::ConflictParameter;

    fn key(k: &[u8]) -> ConflictParameter {
        ConflictParameter::key(k.to_vec())
    }

    fn plain(streams: Vec<StreamId>, count: u32, epoch: Epoch) -> TokenRequest {
        TokenRequest {
            streams,
            num_tokens: count,
            epoch,
            resolution: None,
        }
    }

    #[test]
    fn worked_example() {
        // Empty state, epoch 1. Plain append, then a committing tx, then a
        // tx whose snapshot misses the second commit.
        let mut state = SequencerState::new(1, 64);
        let a = StreamId::new();

        let t0 = state.next_token(&plain(vec![a], 1, 1)).unwrap();
        assert_eq!(t0.global_address, 0);
        assert_eq!(t0.stream_tails[&a], 0);

        let tx1 = TxResolutionInfo::new(NON_ADDRESS).with_write(a, [key(b"key1")]);
        let t1 = state
            .next_token(&TokenRequest {
                streams: vec![a],
                num_tokens: 1,
                epoch: 1,
                resolution: Some(tx1),
            })
            .unwrap();
        assert_eq!(t1.global_address, 1);
        assert_eq!(state.window_len(), 1);

        let tx2 = TxResolutionInfo::new(0).with_write(a, [key(b"key1")]);
        let err = state
            .next_token(&TokenRequest {
                streams: vec![a],
                num_tokens: 1,
                epoch: 1,
                resolution: Some(tx2),
            })
            .unwrap_err();
        assert!(matches!(err, SequencerError::Conflict { .. }));
        // The abort allocated nothing.
        assert_eq!(state.global_tail(), 1);
    }

    #[test]
    fn wrong_epoch_touches_nothing() {
        let mut state = SequencerState::new(1, 64);
        let a = StreamId::new();

        let err = state.next_token(&plain(vec![a], 1, 7)).unwrap_err();
        assert_eq!(err, SequencerError::WrongEpoch { request: 7, current: 1 });
        assert_eq!(state.global_tail(), NON_ADDRESS);
        assert!(state.tails(7, None).is_err());
    }

    #[test]
    fn query_mode_reserves_nothing() {
        let mut state = SequencerState::new(1, 64);
        let a = StreamId::new();
        state.next_token(&plain(vec![a], 2, 1)).unwrap();

        let q = state.next_token(&plain(vec![a], 0, 1)).unwrap();
        assert_eq!(q.global_address, 1);
        assert_eq!(q.stream_tails[&a], 1);
        assert_eq!(state.global_tail(), 1);
    }

    #[test]
    fn aborted_tx_leaves_no_window_entry() {
        let mut state = SequencerState::new(1, 64);
        let a = StreamId::new();

        let tx = TxResolutionInfo::new(NON_ADDRESS).with_write(a, [key(b"k")]);
        state
            .next_token(&TokenRequest {
                streams: vec![a],
                num_tokens: 1,
                epoch: 1,
                resolution: Some(tx),
            })
            .unwrap();

        let stale = TxResolutionInfo::new(NON_ADDRESS).with_write(a, [key(b"k")]);
        assert!(state
            .next_token(&TokenRequest {
                streams: vec![a],
                num_tokens: 1,
                epoch: 1,
                resolution: Some(stale),
            })
            .is_err());
        assert_eq!(state.window_len(), 1);
    }

    #[test]
    fn tx_with_zero_tokens_skips_resolution() {
        let mut state = SequencerState::new(1, 64);
        let a = StreamId::new();

        let tx = TxResolutionInfo::new(NON_ADDRESS).with_write(a, [key(b"k")]);
        state
            .next_token(&TokenRequest {
                streams: vec![a],
                num_tokens: 1,
                epoch: 1,
                resolution: Some(tx),
            })
            .unwrap();

        // A pure query that happens to carry resolution info is still a
        // query: no resolve, no allocation.
        let stale = TxResolutionInfo::new(NON_ADDRESS).with_write(a, [key(b"k")]);
        let q = state
            .next_token(&TokenRequest {
                streams: vec![a],
                num_tokens: 0,
                epoch: 1,
                resolution: Some(stale),
            })
            .unwrap();
        assert_eq!(q.global_address, 0);
        assert_eq!(state.window_len(), 1);
    }

    #[test]
    fn trim_rejects_backward_allows_idempotent() {
        let mut state = SequencerState::new(1, 64);
        let a = StreamId::new();
        state.next_token(&plain(vec![a], 10, 1)).unwrap();

        state.trim(1, 5).unwrap();
        assert_eq!(state.trim_mark(), 5);
        state.trim(1, 5).unwrap();
        assert_eq!(
            state.trim(1, 3),
            Err(SequencerError::InvalidTrimMark { requested: 3, current: 5 })
        );
    }

    #[test]
    fn trim_beyond_global_tail_rejected() {
        let mut state = SequencerState::new(1, 64);
        let a = StreamId::new();
        state.next_token(&plain(vec![a], 11, 1)).unwrap();

        assert_eq!(
            state.trim(1, 100),
            Err(SequencerError::InvalidTrimMark { requested: 100, current: 10 })
        );
        assert_eq!(state.trim_mark(), NON_ADDRESS);
        assert_eq!(state.window_floor(), NON_ADDRESS);

        // The floor never rose, so a transaction with a far-future
        // snapshot still commits a well-formed window entry.
        let tx = TxResolutionInfo::new(100).with_write(a, [key(b"k")]);
        state
            .next_token(&TokenRequest {
                streams: vec![a],
                num_tokens: 1,
                epoch: 1,
                resolution: Some(tx),
            })
            .unwrap();

        // Trimming exactly at the tail remains valid.
        state.trim(1, state.global_tail()).unwrap();
    }

    #[test]
    fn trimmed_snapshot_expires() {
        let mut state = SequencerState::new(1, 64);
        let a = StreamId::new();
        state.next_token(&plain(vec![a], 10, 1)).unwrap();
        state.trim(1, 5).unwrap();

        let tx = TxResolutionInfo::new(4).with_write(a, [key(b"k")]);
        let err = state
            .next_token(&TokenRequest {
                streams: vec![a],
                num_tokens: 1,
                epoch: 1,
                resolution: Some(tx),
            })
            .unwrap_err();
        assert!(matches!(err, SequencerError::SnapshotExpired { .. }));
    }

    #[test]
    fn reset_installs_fresh_state() {
        let mut state = SequencerState::new(1, 64);
        let a = StreamId::new();
        state.next_token(&plain(vec![a], 3, 1)).unwrap();

        state.reset(2, None, 64).unwrap();
        assert_eq!(state.epoch(), 2);
        assert_eq!(state.global_tail(), NON_ADDRESS);
        assert_eq!(state.window_len(), 0);

        // Old-epoch requests are fenced after the reset.
        let err = state.next_token(&plain(vec![a], 1, 1)).unwrap_err();
        assert!(matches!(err, SequencerError::WrongEpoch { .. }));
    }

    #[test]
    fn reset_with_resync_seeds_tails_and_floor() {
        let mut state = SequencerState::new(1, 64);
        let a = StreamId::new();

        state
            .reset(5, Some(TailResync::new(99, HashMap::from([(a, 42)]))), 64)
            .unwrap();
        assert_eq!(state.global_tail(), 99);
        assert_eq!(state.trim_mark(), 99);

        let snap = state.tails(5, Some(&[a])).unwrap();
        assert_eq!(snap.stream_tails[&a], 42);

        // An in-flight transaction from before the failover legitimately
        // sees its snapshot as expired.
        let tx = TxResolutionInfo::new(50).with_write(a, [key(b"k")]);
        let err = state
            .next_token(&TokenRequest {
                streams: vec![a],
                num_tokens: 1,
                epoch: 5,
                resolution: Some(tx),
            })
            .unwrap_err();
        assert!(matches!(err, SequencerError::SnapshotExpired { .. }));
    }

    #[test]
    fn stale_reset_rejected_without_mutation() {
        let mut state = SequencerState::new(3, 64);
        let a = StreamId::new();
        state.next_token(&plain(vec![a], 1, 3)).unwrap();

        assert_eq!(
            state.reset(3, None, 64),
            Err(SequencerError::StaleEpoch { requested: 3, current: 3 })
        );
        assert_eq!(state.global_tail(), 0);
        assert_eq!(state.epoch(), 3);
    }
}
