//! Variable-length integers
//!
//! Unsigned LEB128-style varints plus ZigZag mapping for signed values.
//! A signed 64-bit value takes 1-10 bytes; small magnitudes stay small.
//! The byte layout matches Go's `binary.PutVarint`/`binary.Varint`.

use bytes::BufMut;

use crate::error::{BytesDbError, Result};

/// Longest possible encoding of a 64-bit value
pub const MAX_VARINT_LEN: usize = 10;

/// Append `v` as an unsigned varint.
pub fn put_uvarint(out: &mut impl BufMut, mut v: u64) {
    while v >= 0x80 {
        out.put_u8((v as u8) | 0x80);
        v >>= 7;
    }
    out.put_u8(v as u8);
}

/// Append `v` as a ZigZag-encoded signed varint.
pub fn put_varint(out: &mut impl BufMut, v: i64) {
    put_uvarint(out, zigzag(v));
}

/// Decode an unsigned varint from the front of `src`.
///
/// Returns the value and the number of bytes consumed.
pub fn uvarint(src: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0u32;

    for (i, &byte) in src.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(BytesDbError::Framing(
                "varint longer than 10 bytes".to_string(),
            ));
        }
        if byte < 0x80 {
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(BytesDbError::Framing("varint overflows 64 bits".to_string()));
            }
            return Ok((result | (u64::from(byte) << shift), i + 1));
        }
        result |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }

    Err(BytesDbError::Framing(format!(
        "truncated varint after {} bytes",
        src.len()
    )))
}

/// Decode a ZigZag-encoded signed varint from the front of `src`.
pub fn varint(src: &[u8]) -> Result<(i64, usize)> {
    let (raw, n) = uvarint(src)?;
    Ok((unzigzag(raw), n))
}

/// Number of bytes `put_varint` produces for `v`.
pub fn varint_len(v: i64) -> usize {
    let mut raw = zigzag(v);
    let mut len = 1;
    while raw >= 0x80 {
        raw >>= 7;
        len += 1;
    }
    len
}

#[inline]
fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

#[inline]
fn unzigzag(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}
