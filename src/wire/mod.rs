//! Binary wire codec for the sequencer's request/response payloads.
//!
//! Transport framing is owned by the caller; this module only defines the
//! byte layout of each payload. All integers are big-endian. Stream
//! identifiers travel as their two 64-bit halves, most-significant first.
//!
//! The tails response writes, after the log tail and an entry count, each
//! stream identifier's two halves followed by that stream's tail value.
//! (An earlier generation of this payload omitted the per-entry tail
//! value; that layout is not readable by this codec.)

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

use crate::domain::{
    Address, ConflictParameter, ConflictSet, Epoch, StreamId, TailResync, TailsSnapshot, Token,
    TxId, TxResolutionInfo,
};

/// Decode failures. Encoding is infallible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("payload truncated: needed {needed} more bytes")]
    Truncated { needed: usize },

    #[error("unknown tag {tag} for {field}")]
    UnknownTag { field: &'static str, tag: u8 },
}

type Result<T> = std::result::Result<T, WireError>;

const PARAM_WHOLE_STREAM: u8 = 0;
const PARAM_KEY: u8 = 1;

fn need(buf: &impl Buf, n: usize) -> Result<()> {
    if buf.remaining() < n {
        return Err(WireError::Truncated {
            needed: n - buf.remaining(),
        });
    }
    Ok(())
}

/// Cap a declared element count by what the remaining bytes could possibly
/// hold, so a hostile length prefix cannot force a huge reservation before
/// the per-element length checks reject the payload.
fn capped(count: usize, buf: &impl Buf, min_entry: usize) -> usize {
    count.min(buf.remaining() / min_entry)
}

fn put_stream_id(buf: &mut BytesMut, id: StreamId) {
    let (msb, lsb) = id.halves();
    buf.put_u64(msb);
    buf.put_u64(lsb);
}

fn get_stream_id(buf: &mut impl Buf) -> Result<StreamId> {
    need(buf, 16)?;
    let msb = buf.get_u64();
    let lsb = buf.get_u64();
    Ok(StreamId::from_halves(msb, lsb))
}

fn put_bool(buf: &mut BytesMut, v: bool) {
    buf.put_u8(v as u8);
}

fn get_bool(buf: &mut impl Buf, field: &'static str) -> Result<bool> {
    need(buf, 1)?;
    match buf.get_u8() {
        0 => Ok(false),
        1 => Ok(true),
        tag => Err(WireError::UnknownTag { field, tag }),
    }
}

fn put_conflict_set(buf: &mut BytesMut, set: &ConflictSet) {
    buf.put_u32(set.len() as u32);
    // Sorted for a canonical byte layout.
    let mut streams: Vec<_> = set.keys().copied().collect();
    streams.sort_unstable();
    for stream in streams {
        put_stream_id(buf, stream);
        let params = &set[&stream];
        buf.put_u32(params.len() as u32);
        let mut ordered: Vec<_> = params.iter().collect();
        ordered.sort_by_key(|p| match p {
            ConflictParameter::WholeStream => (0u8, Vec::new()),
            ConflictParameter::Key(k) => (1u8, k.clone()),
        });
        for param in ordered {
            match param {
                ConflictParameter::WholeStream => buf.put_u8(PARAM_WHOLE_STREAM),
                ConflictParameter::Key(k) => {
                    buf.put_u8(PARAM_KEY);
                    buf.put_u32(k.len() as u32);
                    buf.put_slice(k);
                }
            }
        }
    }
}

fn get_conflict_set(buf: &mut impl Buf) -> Result<ConflictSet> {
    need(buf, 4)?;
    let streams = buf.get_u32() as usize;
    // Each stream entry is at least an identifier plus a parameter count.
    let mut set = ConflictSet::with_capacity(capped(streams, buf, 20));
    for _ in 0..streams {
        let stream = get_stream_id(buf)?;
        need(buf, 4)?;
        let count = buf.get_u32() as usize;
        let mut params = std::collections::HashSet::with_capacity(capped(count, buf, 1));
        for _ in 0..count {
            need(buf, 1)?;
            match buf.get_u8() {
                PARAM_WHOLE_STREAM => {
                    params.insert(ConflictParameter::WholeStream);
                }
                PARAM_KEY => {
                    need(buf, 4)?;
                    let len = buf.get_u32() as usize;
                    need(buf, len)?;
                    let mut key = vec![0u8; len];
                    buf.copy_to_slice(&mut key);
                    params.insert(ConflictParameter::Key(key));
                }
                tag => return Err(WireError::UnknownTag { field: "conflict parameter", tag }),
            }
        }
        set.insert(stream, params);
    }
    Ok(set)
}

/// `NextTokenRequest{stream_ids, num_tokens, epoch, resolution?}`
pub fn encode_token_request(
    buf: &mut BytesMut,
    epoch: Epoch,
    num_tokens: u32,
    streams: &[StreamId],
    resolution: Option<&TxResolutionInfo>,
) {
    buf.put_u64(epoch);
    buf.put_u32(num_tokens);
    buf.put_u32(streams.len() as u32);
    for stream in streams {
        put_stream_id(buf, *stream);
    }
    match resolution {
        None => put_bool(buf, false),
        Some(tx) => {
            put_bool(buf, true);
            buf.put_slice(tx.tx_id.0.as_bytes());
            buf.put_i64(tx.snapshot_sequence);
            put_conflict_set(buf, &tx.write_conflicts);
            put_conflict_set(buf, &tx.read_conflicts);
        }
    }
}

pub struct TokenRequestWire {
    pub epoch: Epoch,
    pub num_tokens: u32,
    pub streams: Vec<StreamId>,
    pub resolution: Option<TxResolutionInfo>,
}

pub fn decode_token_request(buf: &mut impl Buf) -> Result<TokenRequestWire> {
    need(buf, 16)?;
    let epoch = buf.get_u64();
    let num_tokens = buf.get_u32();
    let count = buf.get_u32() as usize;
    let mut streams = Vec::with_capacity(capped(count, buf, 16));
    for _ in 0..count {
        streams.push(get_stream_id(buf)?);
    }
    let resolution = if get_bool(buf, "resolution flag")? {
        need(buf, 24)?;
        let mut id = [0u8; 16];
        buf.copy_to_slice(&mut id);
        let snapshot_sequence = buf.get_i64();
        let write_conflicts = get_conflict_set(buf)?;
        let read_conflicts = get_conflict_set(buf)?;
        Some(TxResolutionInfo {
            tx_id: TxId::from_uuid(uuid::Uuid::from_bytes(id)),
            snapshot_sequence,
            write_conflicts,
            read_conflicts,
        })
    } else {
        None
    };
    Ok(TokenRequestWire {
        epoch,
        num_tokens,
        streams,
        resolution,
    })
}

/// `NextTokenResponse{global_address, per_stream_offsets, epoch}`
pub fn encode_token_response(buf: &mut BytesMut, token: &Token) {
    buf.put_u64(token.epoch);
    buf.put_i64(token.global_address);
    buf.put_u32(token.stream_tails.len() as u32);
    let mut streams: Vec<_> = token.stream_tails.keys().copied().collect();
    streams.sort_unstable();
    for stream in streams {
        put_stream_id(buf, stream);
        buf.put_i64(token.stream_tails[&stream]);
    }
}

pub fn decode_token_response(buf: &mut impl Buf) -> Result<Token> {
    need(buf, 20)?;
    let epoch = buf.get_u64();
    let global_address = buf.get_i64();
    let count = buf.get_u32() as usize;
    let mut stream_tails = std::collections::HashMap::with_capacity(capped(count, buf, 24));
    for _ in 0..count {
        let stream = get_stream_id(buf)?;
        need(buf, 8)?;
        stream_tails.insert(stream, buf.get_i64());
    }
    Ok(Token {
        global_address,
        stream_tails,
        epoch,
    })
}

/// `TailsRequest{stream_ids?, epoch}` — an absent stream list asks for
/// every known stream.
pub fn encode_tails_request(buf: &mut BytesMut, epoch: Epoch, streams: Option<&[StreamId]>) {
    buf.put_u64(epoch);
    match streams {
        None => put_bool(buf, false),
        Some(ids) => {
            put_bool(buf, true);
            buf.put_u32(ids.len() as u32);
            for id in ids {
                put_stream_id(buf, *id);
            }
        }
    }
}

pub fn decode_tails_request(buf: &mut impl Buf) -> Result<(Epoch, Option<Vec<StreamId>>)> {
    need(buf, 8)?;
    let epoch = buf.get_u64();
    let streams = if get_bool(buf, "stream list flag")? {
        need(buf, 4)?;
        let count = buf.get_u32() as usize;
        let mut ids = Vec::with_capacity(capped(count, buf, 16));
        for _ in 0..count {
            ids.push(get_stream_id(buf)?);
        }
        Some(ids)
    } else {
        None
    };
    Ok((epoch, streams))
}

/// `TailsResponse{log_tail, stream_tails}`: log tail, entry count, then per
/// entry the identifier halves and the tail value.
pub fn encode_tails_response(buf: &mut BytesMut, snapshot: &TailsSnapshot) {
    buf.put_i64(snapshot.log_tail);
    buf.put_u32(snapshot.stream_tails.len() as u32);
    let mut streams: Vec<_> = snapshot.stream_tails.keys().copied().collect();
    streams.sort_unstable();
    for stream in streams {
        put_stream_id(buf, stream);
        buf.put_i64(snapshot.stream_tails[&stream]);
    }
}

pub fn decode_tails_response(buf: &mut impl Buf) -> Result<TailsSnapshot> {
    need(buf, 12)?;
    let log_tail = buf.get_i64();
    let count = buf.get_u32() as usize;
    let mut stream_tails = std::collections::HashMap::with_capacity(capped(count, buf, 24));
    for _ in 0..count {
        let stream = get_stream_id(buf)?;
        need(buf, 8)?;
        stream_tails.insert(stream, buf.get_i64());
    }
    Ok(TailsSnapshot {
        log_tail,
        stream_tails,
    })
}

/// `TrimMarkRequest{mark, epoch}`
pub fn encode_trim_request(buf: &mut BytesMut, epoch: Epoch, mark: Address) {
    buf.put_u64(epoch);
    buf.put_i64(mark);
}

pub fn decode_trim_request(buf: &mut impl Buf) -> Result<(Epoch, Address)> {
    need(buf, 16)?;
    Ok((buf.get_u64(), buf.get_i64()))
}

/// `ResetRequest{new_epoch, resync?}`
pub fn encode_reset_request(buf: &mut BytesMut, new_epoch: Epoch, resync: Option<&TailResync>) {
    buf.put_u64(new_epoch);
    match resync {
        None => put_bool(buf, false),
        Some(resync) => {
            put_bool(buf, true);
            buf.put_i64(resync.global_tail);
            buf.put_u32(resync.stream_tails.len() as u32);
            let mut streams: Vec<_> = resync.stream_tails.keys().copied().collect();
            streams.sort_unstable();
            for stream in streams {
                put_stream_id(buf, stream);
                buf.put_i64(resync.stream_tails[&stream]);
            }
        }
    }
}

pub fn decode_reset_request(buf: &mut impl Buf) -> Result<(Epoch, Option<TailResync>)> {
    need(buf, 8)?;
    let new_epoch = buf.get_u64();
    let resync = if get_bool(buf, "resync flag")? {
        need(buf, 12)?;
        let global_tail = buf.get_i64();
        let count = buf.get_u32() as usize;
        let mut stream_tails = std::collections::HashMap::with_capacity(capped(count, buf, 24));
        for _ in 0..count {
            let stream = get_stream_id(buf)?;
            need(buf, 8)?;
            stream_tails.insert(stream, buf.get_i64());
        }
        Some(TailResync {
            global_tail,
            stream_tails,
        })
    } else {
        None
    };
    Ok((new_epoch, resync))
}
