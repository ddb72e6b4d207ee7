//! Error types for BytesDB
//!
//! Provides a unified error type for all storage operations.

use thiserror::Error;

use crate::storage::StorageId;

/// Result type alias using BytesDbError
pub type Result<T> = std::result::Result<T, BytesDbError>;

/// Unified error type for BytesDB operations
#[derive(Debug, Error)]
pub enum BytesDbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Framing Errors
    // -------------------------------------------------------------------------
    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Checksum mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Read out of bounds: offset {offset} + len {len} exceeds segment size {size}")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    #[error("Segment {0} does not belong to this table")]
    SegmentNotFound(u64),

    #[error("Storage {0} is closed")]
    Closed(StorageId),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
