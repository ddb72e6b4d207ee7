//! # BytesDB
//!
//! Storage core of a key-value engine:
//! - Fixed binary record framing (checksum, type, varint sizes, payload)
//! - Append-only, size-bounded segment files per table
//! - A manager routing per-table record operations to their segments
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Index / Compaction (collaborators)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  write / read / delete by position
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Storage Manager                            │
//! │          (Session → Store, RwLock-guarded map)               │
//! └──────────┬──────────────────────────────┬───────────────────┘
//!            │ pack / unpack                │ append / read_at
//!            ▼                              ▼
//!   ┌─────────────────┐          ┌──────────────────────┐
//!   │  Record Codec   │          │  LocalFileStorage    │
//!   │  (pure framing) │          │  (segments per table)│
//!   └─────────────────┘          └──────────────────────┘
//! ```
//!
//! ## Durability
//!
//! Appends are single `write` calls on a file opened in append mode. There
//! is no partial-write recovery: if an append is interrupted, the bytes at
//! that position are undefined and decoding them fails with a framing error.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BytesDbError, Result};
pub use config::{Config, StorageType};
pub use record::{Record, RecordHeader, RecordType};
pub use storage::{RecordPosition, Session, Storage, StorageId, StorageManager};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of BytesDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
