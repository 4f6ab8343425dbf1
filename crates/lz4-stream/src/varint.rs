//! Variable-length unsigned integers.
//!
//! Seven payload bits per byte, least significant group first, high bit set
//! on every byte except the last. Decoding stops after 64 bits of shift.
//!
//! A zero byte where a fresh varint should start is the end-of-data
//! sentinel. A zero byte after a continuation byte is rejected as corrupt:
//! the group would encode nothing and the length it belongs to can no longer
//! be trusted.

use world_common::{WorldError, WorldResult};

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Outcome of decoding one varint from a byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A complete value.
    Value(u64),
    /// A zero byte at a varint boundary.
    Sentinel,
    /// The source had no bytes left at a varint boundary.
    Exhausted,
}

/// Decode one varint, pulling bytes from `next_byte`.
///
/// `next_byte` returns `Ok(None)` once the source is exhausted. Running out of
/// bytes after a continuation byte is a truncated stream.
pub fn decode_with<F>(mut next_byte: F) -> WorldResult<Decoded>
where
    F: FnMut() -> WorldResult<Option<u8>>,
{
    let mut result = 0u64;
    let mut shift = 0u32;

    loop {
        let byte = match next_byte()? {
            Some(byte) => byte,
            None if shift == 0 => return Ok(Decoded::Exhausted),
            None => {
                return Err(WorldError::TruncatedStream {
                    expected: 1,
                    available: 0,
                })
            }
        };

        if byte == 0 {
            if shift == 0 {
                return Ok(Decoded::Sentinel);
            }
            return Err(WorldError::corrupt(format!(
                "zero byte inside varint after {} group(s)",
                shift / 7
            )));
        }

        result |= u64::from(byte & 0x7F) << shift;
        shift += 7;

        if byte & 0x80 == 0 || shift >= 64 {
            return Ok(Decoded::Value(result));
        }
    }
}

/// Append the varint encoding of `value` to `out`.
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let group = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(group);
            return;
        }
        out.push(group | 0x80);
    }
}

/// Decode a varint at a fresh boundary from the start of `bytes`.
///
/// Returns `None` for the end-of-data sentinel or an empty slice, otherwise
/// the value and the number of bytes consumed.
pub fn try_decode_varint(bytes: &[u8]) -> WorldResult<Option<(u64, usize)>> {
    let mut consumed = 0usize;
    let decoded = decode_with(|| {
        let byte = bytes.get(consumed).copied();
        if byte.is_some() {
            consumed += 1;
        }
        Ok(byte)
    })?;

    Ok(match decoded {
        Decoded::Value(value) => Some((value, consumed)),
        Decoded::Sentinel | Decoded::Exhausted => None,
    })
}

/// Decode a varint that must be present, such as a chunk length.
///
/// A lone zero byte is the value `0` here; an empty slice is truncation.
pub fn decode_varint(bytes: &[u8]) -> WorldResult<(u64, usize)> {
    match bytes.first() {
        None => Err(WorldError::TruncatedStream {
            expected: 1,
            available: 0,
        }),
        Some(0) => Ok((0, 1)),
        Some(_) => try_decode_varint(bytes)?.ok_or_else(|| {
            WorldError::corrupt("varint decoder consumed no bytes")
        }),
    }
}

/// Number of bytes `encode_varint` produces for `value`.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}
