//! Core type definitions for the stream-log sequencer.
//!
//! Addresses, stream identifiers, epochs and conflict parameters. These are
//! the vocabulary shared by the sequencer core, the REST layer and the
//! binary wire codec.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the global log. Totally ordered, non-negative once
/// allocated.
pub type Address = i64;

/// Sentinel for "no position yet": the tail of an empty log, the tail of a
/// stream that was never written, the initial trim mark, and the snapshot of
/// a transaction that read before the first entry.
pub const NON_ADDRESS: Address = -1;

/// Generation counter stamped on every request; fences stale clients after
/// a leadership or configuration change.
pub type Epoch = u64;

/// Opaque 128-bit identifier of a logical stream (a named partition of the
/// shared log).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub uuid::Uuid);

impl StreamId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }

    /// The identifier's two 64-bit halves, as laid out on the wire
    /// (most-significant half first).
    pub fn halves(&self) -> (u64, u64) {
        let b = self.0.as_u128();
        ((b >> 64) as u64, b as u64)
    }

    pub fn from_halves(msb: u64, lsb: u64) -> Self {
        Self(uuid::Uuid::from_u128(((msb as u128) << 64) | lsb as u128))
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction identifier, carried for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub uuid::Uuid);

impl TxId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a logically conflicting resource within a stream.
///
/// `WholeStream` is the distinguished stream-level parameter: it conflicts
/// with every parameter in the same stream. `Key` carries an opaque byte
/// string (typically a hashed key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictParameter {
    WholeStream,
    Key(#[serde(with = "bytes_hex")] Vec<u8>),
}

impl ConflictParameter {
    pub fn key(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Key(bytes.into())
    }

    pub fn is_whole_stream(&self) -> bool {
        matches!(self, ConflictParameter::WholeStream)
    }
}

/// Serde module for conflict-parameter key bytes as hex strings.
pub mod bytes_hex {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
