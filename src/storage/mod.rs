//! Storage Module
//!
//! Append-only, size-bounded segment files per logical table, plus the
//! manager that routes record operations to them.
//!
//! ## Responsibilities
//! - One directory per table: `{root}/{schema}/{table}/`
//! - One active segment accepting appends, older segments immutable
//! - Rotate to a new segment when an append would cross the size limit
//! - Address records by (segment, offset, size)
//!
//! ## Directory Layout
//! ```text
//! {root}/
//! └── {schema}/
//!     └── {table}/
//!         ├── 0000000000.data     (prior, immutable)
//!         ├── 0000000001.data     (prior, immutable)
//!         └── 0000000002.data     (active)
//! ```

mod local_file;
mod manager;
mod segment;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use local_file::LocalFileStorage;
pub use manager::StorageManager;
pub use segment::{SegmentScanner, TableScanner, SEGMENT_EXTENSION};

// =============================================================================
// Identities and Addresses
// =============================================================================

/// Lookup key the manager routes on: one logical table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Session {
    pub schema: String,
    pub table: String,
}

impl Session {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

/// Identity a store reports for itself
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageId {
    pub schema: String,
    pub table: String,
}

impl From<&Session> for StorageId {
    fn from(session: &Session) -> Self {
        Self {
            schema: session.schema.clone(),
            table: session.table.clone(),
        }
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.schema, self.table)
    }
}

/// Address of one packed record
///
/// `position` is a byte offset inside `segment`, not a table-wide offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordPosition {
    pub segment: u64,
    pub position: u64,
    pub size: u64,
}

/// Where an append landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentAppend {
    pub segment: u64,
    pub offset: u64,
    pub len: u64,
}

/// A segment file owned by a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub id: u64,
    pub path: PathBuf,
}

// =============================================================================
// Storage Backend
// =============================================================================

/// Append-only byte storage for one logical table.
///
/// Implementations serialize their own mutations; every method takes `&self`
/// so a store can be shared behind an `Arc`.
pub trait Storage: Send + Sync {
    /// Positional read from the active segment. Fills `buf` completely.
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Positional read from any segment the table owns.
    fn read_segment(&self, segment: u64, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Current byte length of any segment the table owns.
    fn segment_len(&self, segment: u64) -> Result<u64>;

    /// Append `buf` to the active segment, rotating first if it would
    /// cross the size limit.
    fn append(&self, buf: &[u8]) -> Result<SegmentAppend>;

    /// Append and report only the byte count.
    fn write(&self, buf: &[u8]) -> Result<usize> {
        Ok(self.append(buf)?.len as usize)
    }

    /// Make every byte appended so far durable.
    fn flush(&self) -> Result<()>;

    /// Release the active file handle. Later calls fail with `Closed`.
    fn close(&self) -> Result<()>;

    /// Byte length of the active segment only.
    fn size(&self) -> Result<u64>;

    fn current_storage_id(&self) -> StorageId;

    /// All segments, oldest first; the last one is active.
    fn segments(&self) -> Result<Vec<SegmentInfo>>;

    /// Delete the table directory and every segment in it. Irreversible;
    /// the store is closed afterwards.
    fn remove_all(&self) -> Result<()>;
}
