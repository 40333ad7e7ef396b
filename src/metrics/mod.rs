//! Request counters and the periodic server-metrics report.
//!
//! These feed an external monitoring collaborator and carry no ordering
//! semantics; nothing in the allocation path depends on them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::core::SequencerStatus;

/// Lock-free counters over the sequencer's request outcomes.
#[derive(Debug, Default)]
pub struct SequencerMetrics {
    tokens_issued: AtomicU64,
    tail_queries: AtomicU64,
    conflicts: AtomicU64,
    snapshots_expired: AtomicU64,
    wrong_epoch: AtomicU64,
    trims: AtomicU64,
    resets: AtomicU64,
}

impl SequencerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_token_issued(&self) {
        self.tokens_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tail_query(&self) {
        self.tail_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_expired(&self) {
        self.snapshots_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wrong_epoch(&self) {
        self.wrong_epoch.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trim(&self) {
        self.trims.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tokens_issued: self.tokens_issued.load(Ordering::Relaxed),
            tail_queries: self.tail_queries.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            snapshots_expired: self.snapshots_expired.load(Ordering::Relaxed),
            wrong_epoch: self.wrong_epoch.load(Ordering::Relaxed),
            trims: self.trims.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tokens_issued: u64,
    pub tail_queries: u64,
    pub conflicts: u64,
    pub snapshots_expired: u64,
    pub wrong_epoch: u64,
    pub trims: u64,
    pub resets: u64,
}

/// The read-only health/status payload exchanged with a monitoring
/// collaborator: the node's endpoint identity plus its counters and
/// internal gauges.
#[derive(Debug, Clone, Serialize)]
pub struct ServerMetrics {
    pub endpoint: String,
    pub sequencer: SequencerStatus,
    pub counters: MetricsSnapshot,
}
