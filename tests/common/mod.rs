//! Common test utilities and fixtures for integration tests.

#![allow(dead_code)]

use streamlog_sequencer::core::{Sequencer, SequencerConfig, TokenRequest};
use streamlog_sequencer::domain::{ConflictParameter, Epoch, StreamId};

/// Fixed stream A used across scenarios.
pub fn stream_a() -> StreamId {
    StreamId::from_uuid(uuid::Uuid::parse_str("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa").unwrap())
}

/// Fixed stream B used across scenarios.
pub fn stream_b() -> StreamId {
    StreamId::from_uuid(uuid::Uuid::parse_str("bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb").unwrap())
}

/// A sequencer at epoch 1 with a small conflict window.
pub fn test_sequencer() -> Sequencer {
    Sequencer::new(SequencerConfig {
        initial_epoch: 1,
        window_size: 64,
    })
}

/// A plain (non-transactional) token request.
pub fn plain_request(streams: Vec<StreamId>, count: u32, epoch: Epoch) -> TokenRequest {
    TokenRequest {
        streams,
        num_tokens: count,
        epoch,
        resolution: None,
    }
}

/// A conflict key parameter.
pub fn key(k: &str) -> ConflictParameter {
    ConflictParameter::key(k.as_bytes().to_vec())
}
