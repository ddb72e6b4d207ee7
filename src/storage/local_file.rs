//! Local File Storage
//!
//! Segmented append-only files on the local filesystem, one directory per table.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::{BytesDbError, Result};

use super::segment::{list_segment_ids, read_exact_at, segment_path};
use super::{SegmentAppend, SegmentInfo, Storage, StorageId};

/// Segmented log store for one table
///
/// ## Concurrency:
/// - `state`: RwLock. Appends, rotation, close and removal take it
///   exclusively; reads, flush and size queries share it.
/// - The size check, rotation and append happen under one write guard, so
///   the offset reported for an append is never skewed by another writer.
pub struct LocalFileStorage {
    /// `{root}/{schema}/{table}`
    dir: PathBuf,

    id: StorageId,

    /// Rotation threshold for the active segment
    max_size: u64,

    state: RwLock<SegmentState>,
}

struct SegmentState {
    /// None once the store is closed or removed
    active: Option<ActiveSegment>,

    /// Superseded segment ids, oldest first
    old: Vec<u64>,
}

struct ActiveSegment {
    id: u64,
    file: File,
    /// Cached length; every append goes through this store
    size: u64,
}

impl LocalFileStorage {
    /// Open or create the store for `{root}/{schema}/{table}`
    ///
    /// On startup:
    /// 1. Create the table directory if it doesn't exist
    /// 2. Discover existing segment files
    /// 3. Resume appending to the highest-numbered one (or create segment 0)
    pub fn open(root: &Path, schema: &str, table: &str, max_size: u64) -> Result<Self> {
        let dir = root.join(schema).join(table);
        fs::create_dir_all(&dir)?;

        let mut old = list_segment_ids(&dir)?;
        let active_id = old.pop().unwrap_or(0);
        let active = ActiveSegment::open(&dir, active_id)?;

        tracing::info!(
            "Opened storage {}/{} at {} (active segment {}, {} prior, {} bytes)",
            schema,
            table,
            dir.display(),
            active.id,
            old.len(),
            active.size
        );

        Ok(Self {
            dir,
            id: StorageId {
                schema: schema.to_string(),
                table: table.to_string(),
            },
            max_size,
            state: RwLock::new(SegmentState {
                active: Some(active),
                old,
            }),
        })
    }

    /// Table directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rotation threshold in bytes
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Id of the segment currently accepting appends
    pub fn active_segment(&self) -> Result<u64> {
        let state = self.state.read();
        Ok(self.active(&state)?.id)
    }

    fn active<'a>(&self, state: &'a SegmentState) -> Result<&'a ActiveSegment> {
        state
            .active
            .as_ref()
            .ok_or_else(|| BytesDbError::Closed(self.id.clone()))
    }

    /// Sync and retire the active segment, then open the next one.
    ///
    /// Called with the write guard held.
    fn rotate(&self, state: &mut SegmentState) -> Result<()> {
        let current = state
            .active
            .as_ref()
            .ok_or_else(|| BytesDbError::Closed(self.id.clone()))?;
        current.file.sync_all()?;

        let next = ActiveSegment::open(&self.dir, current.id + 1)?;

        tracing::debug!(
            "Rotating {}: segment {} retired at {} bytes, segment {} now active",
            self.id,
            current.id,
            current.size,
            next.id
        );

        let retired = state.active.replace(next);
        if let Some(retired) = retired {
            state.old.push(retired.id);
        }
        Ok(())
    }
}

fn missing_segment(e: io::Error, segment: u64) -> BytesDbError {
    if e.kind() == io::ErrorKind::NotFound {
        BytesDbError::SegmentNotFound(segment)
    } else {
        e.into()
    }
}

impl ActiveSegment {
    fn open(dir: &Path, id: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(segment_path(dir, id))?;
        let size = file.metadata()?.len();
        Ok(Self { id, file, size })
    }
}

impl Storage for LocalFileStorage {
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let state = self.state.read();
        let active = self.active(&state)?;
        read_exact_at(&active.file, buf, offset, active.size)
    }

    fn read_segment(&self, segment: u64, buf: &mut [u8], offset: u64) -> Result<usize> {
        {
            let state = self.state.read();
            let active = self.active(&state)?;
            if active.id == segment {
                return read_exact_at(&active.file, buf, offset, active.size);
            }
            if !state.old.contains(&segment) {
                return Err(BytesDbError::SegmentNotFound(segment));
            }
        }

        // Retired segments are immutable; no lock needed past this point.
        // A concurrent remove_all can still delete the file first.
        let file = File::open(segment_path(&self.dir, segment))
            .map_err(|e| missing_segment(e, segment))?;
        let size = file.metadata()?.len();
        read_exact_at(&file, buf, offset, size)
    }

    fn segment_len(&self, segment: u64) -> Result<u64> {
        {
            let state = self.state.read();
            let active = self.active(&state)?;
            if active.id == segment {
                return Ok(active.size);
            }
            if !state.old.contains(&segment) {
                return Err(BytesDbError::SegmentNotFound(segment));
            }
        }

        let meta = fs::metadata(segment_path(&self.dir, segment))
            .map_err(|e| missing_segment(e, segment))?;
        Ok(meta.len())
    }

    fn append(&self, buf: &[u8]) -> Result<SegmentAppend> {
        let mut state = self.state.write();
        let len = buf.len() as u64;

        let size = self.active(&state)?.size;
        if size > 0 && size + len > self.max_size {
            self.rotate(&mut state)?;
        }

        let active = state
            .active
            .as_mut()
            .ok_or_else(|| BytesDbError::Closed(self.id.clone()))?;

        if let Err(e) = active.file.write_all(buf) {
            // A partial append leaves bytes behind; resync with the file.
            if let Ok(meta) = active.file.metadata() {
                active.size = meta.len();
            }
            return Err(e.into());
        }
        active.size += len;

        Ok(SegmentAppend {
            segment: active.id,
            offset: active.size - len,
            len,
        })
    }

    fn flush(&self) -> Result<()> {
        let state = self.state.read();
        self.active(&state)?.file.sync_all()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        if let Some(active) = state.active.take() {
            active.file.sync_all()?;
            tracing::debug!("Closed storage {} (active segment {})", self.id, active.id);
        }
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        let state = self.state.read();
        Ok(self.active(&state)?.size)
    }

    fn current_storage_id(&self) -> StorageId {
        self.id.clone()
    }

    fn segments(&self) -> Result<Vec<SegmentInfo>> {
        let state = self.state.read();
        let active = self.active(&state)?;

        Ok(state
            .old
            .iter()
            .chain(std::iter::once(&active.id))
            .map(|&id| SegmentInfo {
                id,
                path: segment_path(&self.dir, id),
            })
            .collect())
    }

    fn remove_all(&self) -> Result<()> {
        let mut state = self.state.write();
        // Drop the handle before the directory goes away.
        state.active = None;
        state.old.clear();

        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!("Removed all data for {} at {}", self.id, self.dir.display());
        Ok(())
    }
}
