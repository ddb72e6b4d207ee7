//! Record Module
//!
//! On-disk framing of a single key/value record. Pure encode/decode, no I/O.
//!
//! ## Record Format
//! ```text
//! ┌──────────────┬─────────┬──────────────┬──────────────┬───────┬─────────┐
//! │ Checksum (4) │ Type(1) │ KeySize (vi) │ ValSize (vi) │  Key  │  Value  │
//! └──────────────┴─────────┴──────────────┴──────────────┴───────┴─────────┘
//! ```
//! - Checksum: CRC32 (LE) of every byte after the field, or 0 if not computed
//! - Type: 0 = Normal, 1 = Deleted (tombstone)
//! - Sizes: ZigZag varints, 1-10 bytes each
//! - No padding or alignment between fields

mod header;
pub mod varint;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BytesDbError, Result};

pub use header::{RecordHeader, RecordType, CHECKSUM_SIZE, FIXED_HEADER_SIZE};

/// A key/value record as stored in a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
    pub typ: RecordType,
}

impl Record {
    /// A live key/value record
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            typ: RecordType::Normal,
        }
    }

    /// A tombstone for `key` with an empty value
    pub fn tombstone(key: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: Bytes::new(),
            typ: RecordType::Deleted,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.typ == RecordType::Deleted
    }

    /// Header describing this record (checksum not yet computed)
    pub fn header(&self) -> RecordHeader {
        RecordHeader::new(self.typ, self.key.len() as u64, self.value.len() as u64)
    }

    /// Total encoded length: header + key + value
    pub fn encoded_len(&self) -> usize {
        self.header().encoded_len() + self.key.len() + self.value.len()
    }

    /// Encode header, key and value into one contiguous buffer.
    ///
    /// The checksum field is filled in last, over the bytes that follow it.
    pub fn pack(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.encoded_len());
        self.header().pack_into(&mut out);
        out.put_slice(&self.key);
        out.put_slice(&self.value);

        let checksum = crc32fast::hash(&out[CHECKSUM_SIZE..]);
        out[..CHECKSUM_SIZE].copy_from_slice(&checksum.to_le_bytes());
        out.freeze()
    }

    /// Decode a buffer holding exactly one record.
    pub fn unpack(src: &[u8]) -> Result<Self> {
        let (record, consumed) = Self::decode_prefix(src)?;
        if consumed != src.len() {
            return Err(BytesDbError::Framing(format!(
                "{} trailing bytes after record",
                src.len() - consumed
            )));
        }
        Ok(record)
    }

    /// Decode the record at the front of `src`.
    ///
    /// Returns the record and the number of bytes it occupied, so callers can
    /// walk a segment record by record.
    pub fn decode_prefix(src: &[u8]) -> Result<(Self, usize)> {
        let (header, header_len) = RecordHeader::unpack(src)?;

        let total = (header_len as u64)
            .checked_add(header.key_size)
            .and_then(|n| n.checked_add(header.value_size))
            .filter(|&n| n <= src.len() as u64)
            .ok_or_else(|| {
                BytesDbError::Framing(format!(
                    "truncated record: header declares {} key + {} value bytes, {} available",
                    header.key_size,
                    header.value_size,
                    src.len() - header_len
                ))
            })? as usize;

        if header.checksum != 0 {
            let actual = crc32fast::hash(&src[CHECKSUM_SIZE..total]);
            if actual != header.checksum {
                return Err(BytesDbError::Checksum {
                    expected: header.checksum,
                    actual,
                });
            }
        }

        let key_end = header_len + header.key_size as usize;
        let record = Self {
            key: Bytes::copy_from_slice(&src[header_len..key_end]),
            value: Bytes::copy_from_slice(&src[key_end..total]),
            typ: header.typ,
        };
        Ok((record, total))
    }
}
