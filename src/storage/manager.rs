//! Storage Manager
//!
//! Routes record operations to per-table stores.
//!
//! ## Responsibilities
//! - Lazily create one store per Session, cached for the process lifetime
//! - Encode records on write and decode them on read
//! - Turn append results into record positions
//! - Close every store on shutdown

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::config::{Config, StorageType};
use crate::error::{BytesDbError, Result};
use crate::record::Record;

use super::{
    LocalFileStorage, RecordPosition, SegmentInfo, Session, Storage, TableScanner,
};

/// Routes sessions to stores
///
/// ## Concurrency:
/// - `storages`: RwLock. Lookups of already-resolved stores share it;
///   creating or evicting a store takes it exclusively and re-checks the
///   map, so two threads never create two stores for one Session.
/// - Each store serializes its own appends; the manager holds no lock while
///   doing I/O on an already-resolved store.
pub struct StorageManager {
    root_path: PathBuf,
    storage_type: StorageType,
    max_segment_size: u64,
    storages: RwLock<HashMap<Session, Arc<dyn Storage>>>,
}

impl StorageManager {
    /// Create a manager from resolved configuration
    ///
    /// Fails with `Config` if the storage type is not recognized.
    pub fn new(config: &Config) -> Result<Self> {
        let storage_type = StorageType::resolve(&config.storage_type)?;

        tracing::info!(
            "Storage manager rooted at {} (backend {}, max segment {} bytes)",
            config.root_path.display(),
            storage_type,
            config.max_segment_size
        );

        Ok(Self {
            root_path: config.root_path.clone(),
            storage_type,
            max_segment_size: config.max_segment_size,
            storages: RwLock::new(HashMap::new()),
        })
    }

    /// Append a record; returns where it landed
    pub fn write(&self, session: &Session, record: &Record) -> Result<RecordPosition> {
        let storage = self.resolve(session)?;
        let bytes = record.pack();
        let appended = storage.append(&bytes)?;

        Ok(RecordPosition {
            segment: appended.segment,
            position: appended.offset,
            size: appended.len,
        })
    }

    /// Read and decode the record at `position`
    pub fn read(&self, session: &Session, position: &RecordPosition) -> Result<Record> {
        let storage = self.resolve(session)?;

        // Bounds are checked before the buffer is sized from the caller's input.
        let segment_len = storage.segment_len(position.segment)?;
        let in_bounds = position
            .position
            .checked_add(position.size)
            .map_or(false, |end| end <= segment_len);
        let len = usize::try_from(position.size)
            .ok()
            .filter(|_| in_bounds)
            .ok_or(BytesDbError::OutOfBounds {
                offset: position.position,
                len: position.size,
                size: segment_len,
            })?;

        let mut buf = vec![0u8; len];
        storage.read_segment(position.segment, &mut buf, position.position)?;

        Record::unpack(&buf)
    }

    /// Append a tombstone for `key`
    pub fn delete(&self, session: &Session, key: impl Into<Bytes>) -> Result<RecordPosition> {
        self.write(session, &Record::tombstone(key))
    }

    /// Destroy every segment of the table
    ///
    /// The store is evicted; the next access starts from an empty table.
    pub fn remove_all_data(&self, session: &Session) -> Result<()> {
        let mut storages = self.storages.write();

        let storage = match storages.remove(session) {
            Some(storage) => storage,
            None => self.create_storage(session)?,
        };
        storage.remove_all()
    }

    /// Byte length of the table's active segment
    pub fn size(&self, session: &Session) -> Result<u64> {
        self.resolve(session)?.size()
    }

    /// Make everything written to the table durable
    pub fn flush(&self, session: &Session) -> Result<()> {
        self.resolve(session)?.flush()
    }

    /// Flush every resolved store
    pub fn flush_all(&self) -> Result<()> {
        let storages = self.storages.read();
        for storage in storages.values() {
            storage.flush()?;
        }
        Ok(())
    }

    /// Segment files of the table, oldest first
    pub fn segments(&self, session: &Session) -> Result<Vec<SegmentInfo>> {
        self.resolve(session)?.segments()
    }

    /// Every record of the table in append order, with its position
    pub fn scan(&self, session: &Session) -> Result<TableScanner> {
        Ok(TableScanner::new(self.segments(session)?))
    }

    /// Close every resolved store
    ///
    /// All stores are closed even if one fails; the first error is returned.
    pub fn close(&self) -> Result<()> {
        let mut storages = self.storages.write();
        let mut first_err = None;

        for (session, storage) in storages.drain() {
            if let Err(e) = storage.close() {
                tracing::warn!("Failed to close {}/{}: {}", session.schema, session.table, e);
                first_err.get_or_insert(e);
            }
        }

        tracing::debug!("Storage manager closed");
        first_err.map_or(Ok(()), Err)
    }

    /// Whether a store has been resolved for `session`
    pub fn contains(&self, session: &Session) -> bool {
        self.storages.read().contains_key(session)
    }

    /// Sessions with a resolved store
    pub fn sessions(&self) -> Vec<Session> {
        self.storages.read().keys().cloned().collect()
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Look up the store for `session`, creating it on first reference
    fn resolve(&self, session: &Session) -> Result<Arc<dyn Storage>> {
        if let Some(storage) = self.storages.read().get(session) {
            return Ok(Arc::clone(storage));
        }

        let mut storages = self.storages.write();
        // Another thread may have won the race between the two locks.
        if let Some(storage) = storages.get(session) {
            return Ok(Arc::clone(storage));
        }

        let storage = self.create_storage(session)?;
        storages.insert(session.clone(), Arc::clone(&storage));

        tracing::debug!("Resolved storage for {}/{}", session.schema, session.table);
        Ok(storage)
    }

    fn create_storage(&self, session: &Session) -> Result<Arc<dyn Storage>> {
        match self.storage_type {
            StorageType::LocalFile => Ok(Arc::new(LocalFileStorage::open(
                &self.root_path,
                &session.schema,
                &session.table,
                self.max_segment_size,
            )?)),
        }
    }
}
