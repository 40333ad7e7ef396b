//! Epoch gate: fences requests from a previous cluster configuration.

use crate::domain::Epoch;

use super::error::{Result, SequencerError};

/// Holds the currently accepted epoch and validates every inbound request
/// against it. The value is only written under the same exclusive lock as
/// the rest of the sequencer state, so a reset is indivisible with respect
/// to concurrent token requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochGate {
    current: Epoch,
}

impl EpochGate {
    pub fn new(epoch: Epoch) -> Self {
        Self { current: epoch }
    }

    pub fn current(&self) -> Epoch {
        self.current
    }

    /// Accept a request only if it carries exactly the current epoch.
    pub fn check(&self, request: Epoch) -> Result<()> {
        if request != self.current {
            return Err(SequencerError::WrongEpoch {
                request,
                current: self.current,
            });
        }
        Ok(())
    }

    /// Install a new epoch. Rejected (idempotently, not fatally) unless the
    /// new epoch is strictly greater than the current one.
    pub fn reset(&mut self, new_epoch: Epoch) -> Result<()> {
        if new_epoch <= self.current {
            return Err(SequencerError::StaleEpoch {
                requested: new_epoch,
                current: self.current,
            });
        }
        self.current = new_epoch;
        Ok(())
    }
}
