//! Record header
//!
//! Fixed checksum and type fields followed by the two varint payload sizes.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{BytesDbError, Result};

use super::varint;

/// Size of the checksum field at the start of every record
pub const CHECKSUM_SIZE: usize = 4;

/// Checksum (4) + type tag (1)
pub const FIXED_HEADER_SIZE: usize = CHECKSUM_SIZE + 1;

/// Kind of record stored in a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RecordType {
    /// A live key/value pair
    Normal = 0,
    /// A tombstone; carries the key and an empty value
    Deleted = 1,
}

impl TryFrom<u8> for RecordType {
    type Error = BytesDbError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(RecordType::Normal),
            1 => Ok(RecordType::Deleted),
            other => Err(BytesDbError::Framing(format!(
                "unknown record type tag: {:#04x}",
                other
            ))),
        }
    }
}

/// Header preceding the key and value bytes of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// CRC32 of everything after this field; 0 means "not computed"
    pub checksum: u32,
    pub typ: RecordType,
    pub key_size: u64,
    pub value_size: u64,
}

impl RecordHeader {
    pub fn new(typ: RecordType, key_size: u64, value_size: u64) -> Self {
        Self {
            checksum: 0,
            typ,
            key_size,
            value_size,
        }
    }

    /// Encoded length of this header in bytes
    pub fn encoded_len(&self) -> usize {
        FIXED_HEADER_SIZE
            + varint::varint_len(self.key_size as i64)
            + varint::varint_len(self.value_size as i64)
    }

    /// Append the encoded header to `out`.
    ///
    /// Layout: checksum (u32 LE) | type (u8) | key_size (varint) | value_size (varint)
    pub fn pack_into(&self, out: &mut impl BufMut) {
        out.put_u32_le(self.checksum);
        out.put_u8(self.typ as u8);
        varint::put_varint(out, self.key_size as i64);
        varint::put_varint(out, self.value_size as i64);
    }

    /// Encode the header on its own.
    pub fn pack(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.encoded_len());
        self.pack_into(&mut out);
        out.freeze()
    }

    /// Decode a header from the front of `src`.
    ///
    /// Returns the header and the number of bytes it occupied.
    pub fn unpack(src: &[u8]) -> Result<(Self, usize)> {
        if src.len() < FIXED_HEADER_SIZE {
            return Err(BytesDbError::Framing(format!(
                "incomplete header: expected at least {} bytes, got {}",
                FIXED_HEADER_SIZE,
                src.len()
            )));
        }

        let checksum = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        let typ = RecordType::try_from(src[CHECKSUM_SIZE])?;

        let mut pos = FIXED_HEADER_SIZE;
        let (key_size, n) = varint::varint(&src[pos..])?;
        pos += n;
        let (value_size, n) = varint::varint(&src[pos..])?;
        pos += n;

        Ok((
            Self {
                checksum,
                typ,
                key_size: non_negative(key_size, "key")?,
                value_size: non_negative(value_size, "value")?,
            },
            pos,
        ))
    }
}

fn non_negative(size: i64, what: &str) -> Result<u64> {
    u64::try_from(size)
        .map_err(|_| BytesDbError::Framing(format!("negative {} size: {}", what, size)))
}
