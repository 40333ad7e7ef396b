//! Sequencer core: epoch fencing, tail tracking, conflict resolution and
//! the serialized token allocation path.

mod epoch;
mod error;
mod sequencer;
mod state;
mod tails;
mod window;

pub use epoch::EpochGate;
pub use error::{Result, SequencerError};
pub use sequencer::{Sequencer, SequencerConfig, SequencerStatus};
pub use state::{SequencerState, TokenRequest};
pub use tails::StreamTailTracker;
pub use window::{ConflictWindow, WindowEntry};
