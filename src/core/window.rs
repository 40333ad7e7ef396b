//! Conflict resolution window: a bounded, ordered history of committed
//! write sets used to validate optimistic transactions.
//!
//! The window retains the write conflict set of every commit above its
//! floor. A transaction commits only if nothing that committed after its
//! snapshot touched a resource the transaction read or intends to write.
//! When the snapshot falls below the floor the evidence is gone, and the
//! window aborts conservatively: false aborts are safe, false commits are
//! not.

use std::collections::{HashSet, VecDeque};

use crate::domain::{Address, ConflictParameter, ConflictSet, TxResolutionInfo, NON_ADDRESS};

use super::error::{Result, SequencerError};

/// The committed write set of a transaction or plain append, stored in
/// commit order.
#[derive(Debug, Clone)]
pub struct WindowEntry {
    pub commit_sequence: Address,
    pub write_conflicts: ConflictSet,
}

/// Ordered, bounded history of recently committed write sets.
#[derive(Debug, Clone)]
pub struct ConflictWindow {
    entries: VecDeque<WindowEntry>,
    /// Sequence at or below which history has been discarded. Raised by
    /// trim-mark advancement and by size eviction, never lowered.
    floor: Address,
    max_entries: usize,
}

impl ConflictWindow {
    pub fn new(max_entries: usize) -> Self {
        Self::with_floor(max_entries, NON_ADDRESS)
    }

    /// A window whose retained floor starts above `NON_ADDRESS`, as after a
    /// reset that resynced tails: any snapshot at or below the floor is
    /// expired from the start.
    pub fn with_floor(max_entries: usize, floor: Address) -> Self {
        Self {
            entries: VecDeque::new(),
            floor,
            max_entries,
        }
    }

    pub fn floor(&self) -> Address {
        self.floor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn oldest_commit(&self) -> Option<Address> {
        self.entries.front().map(|e| e.commit_sequence)
    }

    pub fn newest_commit(&self) -> Option<Address> {
        self.entries.back().map(|e| e.commit_sequence)
    }

    /// Adjudicate a transaction against the retained history.
    ///
    /// Scans entries with `commit_sequence > tx.snapshot_sequence` in commit
    /// order and tests the entry's write set against the transaction's write
    /// and read sets. The first intersection aborts with `Conflict`.
    pub fn resolve(&self, tx: &TxResolutionInfo) -> Result<()> {
        if tx.snapshot_sequence < self.floor {
            return Err(SequencerError::SnapshotExpired {
                snapshot: tx.snapshot_sequence,
                floor: self.floor,
            });
        }

        for entry in &self.entries {
            if entry.commit_sequence <= tx.snapshot_sequence {
                continue;
            }
            for (stream, committed) in &entry.write_conflicts {
                let proposed = tx.write_conflicts.get(stream);
                let read = tx.read_conflicts.get(stream);
                for candidate in proposed.into_iter().chain(read) {
                    if sets_conflict(committed, candidate) {
                        return Err(SequencerError::Conflict {
                            tx: tx.tx_id,
                            stream: *stream,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Record a committed write set. The caller supplies the commit
    /// sequence it was granted; the window never allocates sequence
    /// numbers. Entries must arrive in commit order.
    pub fn append(&mut self, entry: WindowEntry) {
        debug_assert!(
            self.entries
                .back()
                .map_or(true, |last| entry.commit_sequence > last.commit_sequence),
            "window entries must be appended in commit order"
        );
        self.entries.push_back(entry);
        self.evict_overflow();
    }

    /// Raise the floor to the new trim mark and drop the entries that fell
    /// at or below it.
    pub fn trim(&mut self, mark: Address) {
        if mark <= self.floor {
            return;
        }
        self.floor = mark;
        while self.entries.front().map_or(false, |e| e.commit_sequence <= mark) {
            self.entries.pop_front();
        }
    }

    /// Oldest-first eviction beyond the configured maximum. Every evicted
    /// entry raises the floor to its commit sequence, so the
    /// `SnapshotExpired` boundary only ever tightens.
    fn evict_overflow(&mut self) {
        while self.entries.len() > self.max_entries {
            if let Some(evicted) = self.entries.pop_front() {
                self.floor = self.floor.max(evicted.commit_sequence);
            }
        }
    }
}

/// Whether two conflict-parameter sets on the same stream collide.
/// `WholeStream` collides with any non-empty set.
fn sets_conflict(a: &HashSet<ConflictParameter>, b: &HashSet<ConflictParameter>) -> bool {
    if a.contains(&ConflictParameter::WholeStream) && !b.is_empty() {
        return true;
    }
    if b.contains(&ConflictParameter::WholeStream) && !a.is_empty() {
        return true;
    }
    !a.is_disjoint(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConflictSet, StreamId};

    fn write_set(stream: StreamId, params: &[ConflictParameter]) -> ConflictSet {
        ConflictSet::from([(stream, params.iter().cloned().collect())])
    }

    fn key(k: &[u8]) -> ConflictParameter {
        ConflictParameter::key(k.to_vec())
    }

    #[test]
    fn empty_window_commits_everything() {
        let window = ConflictWindow::new(16);
        let tx = TxResolutionInfo::new(NON_ADDRESS)
            .with_write(StreamId::new(), [key(b"k1")]);
        assert!(window.resolve(&tx).is_ok());
    }

    #[test]
    fn conflicting_key_after_snapshot_aborts() {
        let a = StreamId::new();
        let mut window = ConflictWindow::new(16);
        window.append(WindowEntry {
            commit_sequence: 1,
            write_conflicts: write_set(a, &[key(b"k1")]),
        });

        let tx = TxResolutionInfo::new(0).with_write(a, [key(b"k1")]);
        assert!(matches!(
            window.resolve(&tx),
            Err(SequencerError::Conflict { stream, .. }) if stream == a
        ));
    }

    #[test]
    fn commit_at_or_before_snapshot_is_ignored() {
        let a = StreamId::new();
        let mut window = ConflictWindow::new(16);
        window.append(WindowEntry {
            commit_sequence: 1,
            write_conflicts: write_set(a, &[key(b"k1")]),
        });

        let tx = TxResolutionInfo::new(1).with_write(a, [key(b"k1")]);
        assert!(window.resolve(&tx).is_ok());
    }

    #[test]
    fn disjoint_sets_commit() {
        let a = StreamId::new();
        let mut window = ConflictWindow::new(16);
        window.append(WindowEntry {
            commit_sequence: 1,
            write_conflicts: write_set(a, &[key(b"k1")]),
        });

        let tx = TxResolutionInfo::new(0).with_write(a, [key(b"k2")]);
        assert!(window.resolve(&tx).is_ok());

        // Same key on a different stream never conflicts.
        let tx = TxResolutionInfo::new(0).with_write(StreamId::new(), [key(b"k1")]);
        assert!(window.resolve(&tx).is_ok());
    }

    #[test]
    fn read_set_conflicts_too() {
        let a = StreamId::new();
        let mut window = ConflictWindow::new(16);
        window.append(WindowEntry {
            commit_sequence: 1,
            write_conflicts: write_set(a, &[key(b"k1")]),
        });

        let tx = TxResolutionInfo::new(0).with_read(a, [key(b"k1")]);
        assert!(window.resolve(&tx).is_err());
    }

    #[test]
    fn whole_stream_conflicts_with_any_key() {
        let a = StreamId::new();
        let mut window = ConflictWindow::new(16);
        window.append(WindowEntry {
            commit_sequence: 1,
            write_conflicts: write_set(a, &[ConflictParameter::WholeStream]),
        });

        let tx = TxResolutionInfo::new(0).with_write(a, [key(b"anything")]);
        assert!(window.resolve(&tx).is_err());

        // And the other direction: a whole-stream write against any
        // committed key.
        let mut window = ConflictWindow::new(16);
        window.append(WindowEntry {
            commit_sequence: 1,
            write_conflicts: write_set(a, &[key(b"k1")]),
        });
        let tx = TxResolutionInfo::new(0).with_write(a, [ConflictParameter::WholeStream]);
        assert!(window.resolve(&tx).is_err());
    }

    #[test]
    fn snapshot_below_floor_expires() {
        let mut window = ConflictWindow::new(16);
        window.trim(5);

        let tx = TxResolutionInfo::new(3).with_write(StreamId::new(), [key(b"k")]);
        assert_eq!(
            window.resolve(&tx),
            Err(SequencerError::SnapshotExpired { snapshot: 3, floor: 5 })
        );

        // Snapshot exactly at the floor is still resolvable: everything
        // after it is retained.
        let tx = TxResolutionInfo::new(5).with_write(StreamId::new(), [key(b"k")]);
        assert!(window.resolve(&tx).is_ok());
    }

    #[test]
    fn trim_drops_covered_entries() {
        let a = StreamId::new();
        let mut window = ConflictWindow::new(16);
        for seq in 0..4 {
            window.append(WindowEntry {
                commit_sequence: seq,
                write_conflicts: write_set(a, &[key(b"k")]),
            });
        }

        window.trim(2);
        assert_eq!(window.len(), 1);
        assert_eq!(window.oldest_commit(), Some(3));

        // Trim never moves backward.
        window.trim(1);
        assert_eq!(window.floor(), 2);
    }

    #[test]
    fn size_eviction_raises_floor() {
        let a = StreamId::new();
        let mut window = ConflictWindow::new(2);
        for seq in 0..4 {
            window.append(WindowEntry {
                commit_sequence: seq,
                write_conflicts: write_set(a, &[key(b"k")]),
            });
        }

        assert_eq!(window.len(), 2);
        assert_eq!(window.floor(), 1);

        // A snapshot older than the evicted history can no longer be
        // proven conflict-free, even though it is above the trim mark.
        let tx = TxResolutionInfo::new(0).with_write(a, [key(b"other")]);
        assert!(matches!(
            window.resolve(&tx),
            Err(SequencerError::SnapshotExpired { .. })
        ));
    }
}
