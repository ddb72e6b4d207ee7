//! Segment files
//!
//! Naming, discovery, positional reads and sequential scans of segment files.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{BytesDbError, Result};
use crate::record::Record;

use super::{RecordPosition, SegmentInfo};

/// Extension shared by every segment file
pub const SEGMENT_EXTENSION: &str = "data";

// =============================================================================
// Naming
// =============================================================================

/// "{dir}/0000000042.data" for id 42
pub(crate) fn segment_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{:010}.{}", id, SEGMENT_EXTENSION))
}

/// "0000000042.data" → Some(42)
pub(crate) fn parse_segment_id(path: &Path) -> Option<u64> {
    if path.extension()? != SEGMENT_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Ids of every segment file in `dir`, ascending.
pub(crate) fn list_segment_ids(dir: &Path) -> Result<Vec<u64>> {
    let mut ids = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }
        match parse_segment_id(&path) {
            Some(id) => ids.push(id),
            None => tracing::warn!("Ignoring non-segment file {}", path.display()),
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

// =============================================================================
// Positional Reads
// =============================================================================

/// Read exactly `buf.len()` bytes at `offset`, checking against `size` first.
pub(crate) fn read_exact_at(file: &File, buf: &mut [u8], offset: u64, size: u64) -> Result<usize> {
    let len = buf.len() as u64;
    match offset.checked_add(len) {
        Some(end) if end <= size => {}
        _ => return Err(BytesDbError::OutOfBounds { offset, len, size }),
    }

    pread_exact(file, buf, offset)?;
    Ok(buf.len())
}

#[cfg(unix)]
fn pread_exact(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn pread_exact(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

// =============================================================================
// Sequential Scans
// =============================================================================

/// Iterator over the records of one segment file, front to back.
///
/// Stops after the first decode error; a torn append at the tail of the
/// active segment surfaces as a single `Framing` error.
pub struct SegmentScanner {
    segment: u64,
    data: Bytes,
    offset: usize,
    failed: bool,
}

impl SegmentScanner {
    /// Load the segment file at `path`.
    pub fn open(segment: u64, path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(Self {
            segment,
            data: Bytes::from(data),
            offset: 0,
            failed: false,
        })
    }
}

impl Iterator for SegmentScanner {
    type Item = Result<(RecordPosition, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        match Record::decode_prefix(&self.data[self.offset..]) {
            Ok((record, consumed)) => {
                let position = RecordPosition {
                    segment: self.segment,
                    position: self.offset as u64,
                    size: consumed as u64,
                };
                self.offset += consumed;
                Some(Ok((position, record)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Iterator over every segment of a table, oldest first.
pub struct TableScanner {
    pending: VecDeque<SegmentInfo>,
    current: Option<SegmentScanner>,
}

impl TableScanner {
    pub fn new(segments: Vec<SegmentInfo>) -> Self {
        Self {
            pending: segments.into(),
            current: None,
        }
    }
}

impl Iterator for TableScanner {
    type Item = Result<(RecordPosition, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(scanner) = self.current.as_mut() {
                match scanner.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }

            let info = self.pending.pop_front()?;
            match SegmentScanner::open(info.id, &info.path) {
                Ok(scanner) => self.current = Some(scanner),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
