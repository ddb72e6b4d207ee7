//! Tests for StorageManager
//!
//! These tests verify:
//! - Record write/read through returned positions
//! - Positions stay readable after segment rotation
//! - Tombstones are appends
//! - remove_all_data destroys and later recreates a table
//! - Concurrent writers never receive overlapping positions
//! - Backend selection errors at construction

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bytesdb::{BytesDbError, Config, Record, RecordType, Session, StorageManager};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_manager(max_segment_size: u64) -> (TempDir, StorageManager) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .root_path(temp_dir.path())
        .max_segment_size(max_segment_size)
        .build();
    let manager = StorageManager::new(&config).unwrap();
    (temp_dir, manager)
}

fn table_dir(root: &Path, session: &Session) -> PathBuf {
    root.join(&session.schema).join(&session.table)
}

fn session() -> Session {
    Session::new("app", "users")
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_unknown_storage_type_fails_at_construction() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .root_path(temp.path())
        .storage_type("s3")
        .build();

    assert!(matches!(
        StorageManager::new(&config),
        Err(BytesDbError::Config(_))
    ));
}

#[test]
fn test_empty_storage_type_uses_default() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .root_path(temp.path())
        .storage_type("")
        .build();

    let manager = StorageManager::new(&config).unwrap();
    assert_eq!(manager.storage_type(), bytesdb::StorageType::LocalFile);
}

#[test]
fn test_store_created_lazily() {
    let (temp, manager) = setup_manager(1024 * 1024);
    let session = session();

    assert!(!manager.contains(&session));
    assert!(!table_dir(temp.path(), &session).exists());

    assert_eq!(manager.size(&session).unwrap(), 0);

    assert!(manager.contains(&session));
    assert!(table_dir(temp.path(), &session).is_dir());
    assert_eq!(manager.sessions(), vec![session]);
}

// =============================================================================
// Write/Read Tests
// =============================================================================

#[test]
fn test_write_then_read_back() {
    let (_temp, manager) = setup_manager(1024 * 1024);
    let session = session();

    let records: Vec<Record> = (0..100)
        .map(|i| Record::new(format!("key{}", i).into_bytes(), format!("值{}", i).into_bytes()))
        .collect();

    let positions: Vec<_> = records
        .iter()
        .map(|r| manager.write(&session, r).unwrap())
        .collect();

    for (record, position) in records.iter().zip(&positions) {
        assert_eq!(&manager.read(&session, position).unwrap(), record);
    }
}

#[test]
fn test_positions_are_contiguous() {
    let (_temp, manager) = setup_manager(1024 * 1024);
    let session = session();

    let first = manager
        .write(&session, &Record::new(&b"a"[..], &b"1"[..]))
        .unwrap();
    let second = manager
        .write(&session, &Record::new(&b"bb"[..], &b"22"[..]))
        .unwrap();

    assert_eq!(first.position, 0);
    assert_eq!(second.position, first.size);
    assert_eq!(manager.size(&session).unwrap(), first.size + second.size);
}

#[test]
fn test_tables_are_isolated() {
    let (_temp, manager) = setup_manager(1024 * 1024);
    let users = Session::new("app", "users");
    let orders = Session::new("app", "orders");

    let u = manager
        .write(&users, &Record::new(&b"u"[..], &b"user"[..]))
        .unwrap();
    let o = manager
        .write(&orders, &Record::new(&b"o"[..], &b"order"[..]))
        .unwrap();

    assert_eq!(u.position, 0);
    assert_eq!(o.position, 0);
    assert_eq!(manager.read(&users, &u).unwrap().value, &b"user"[..]);
    assert_eq!(manager.read(&orders, &o).unwrap().value, &b"order"[..]);
}

#[test]
fn test_read_with_wrong_size_fails() {
    let (_temp, manager) = setup_manager(1024 * 1024);
    let session = session();

    let mut position = manager
        .write(&session, &Record::new(&b"key"[..], &b"value"[..]))
        .unwrap();
    position.size -= 1;

    assert!(matches!(
        manager.read(&session, &position),
        Err(BytesDbError::Framing(_))
    ));

    position.size += 10;
    assert!(matches!(
        manager.read(&session, &position),
        Err(BytesDbError::OutOfBounds { .. })
    ));
}

#[test]
fn test_read_with_unbounded_length_returns_out_of_bounds() {
    let (_temp, manager) = setup_manager(1024 * 1024);
    let session = session();

    let mut position = manager
        .write(&session, &Record::new(&b"key"[..], &b"value"[..]))
        .unwrap();
    let written = position.size;

    position.size = u64::MAX;
    assert!(matches!(
        manager.read(&session, &position),
        Err(BytesDbError::OutOfBounds { len: u64::MAX, .. })
    ));

    position.size = written;
    position.position = u64::MAX;
    assert!(matches!(
        manager.read(&session, &position),
        Err(BytesDbError::OutOfBounds { .. })
    ));

    position.position = 0;
    position.segment = 42;
    assert!(matches!(
        manager.read(&session, &position),
        Err(BytesDbError::SegmentNotFound(42))
    ));
}

// =============================================================================
// Rotation Tests
// =============================================================================

#[test]
fn test_rotation_resets_size_and_keeps_positions_readable() {
    let (_temp, manager) = setup_manager(256);
    let session = session();

    let mut written = Vec::new();
    let mut total = 0u64;
    for i in 0..50 {
        let record = Record::new(format!("key{:03}", i).into_bytes(), vec![i as u8; 20]);
        let position = manager.write(&session, &record).unwrap();
        total += position.size;
        written.push((record, position));
    }

    let segments = manager.segments(&session).unwrap();
    assert!(segments.len() > 1);

    let size = manager.size(&session).unwrap();
    assert!(size <= 256);
    assert!(size < total);

    for (record, position) in &written {
        assert_eq!(&manager.read(&session, position).unwrap(), record);
    }
}

#[test]
fn test_scan_walks_all_segments_in_order() {
    let (_temp, manager) = setup_manager(64);
    let session = session();

    let mut expected = Vec::new();
    for i in 0..20 {
        let record = if i % 5 == 4 {
            Record::tombstone(format!("k{}", i - 1).into_bytes())
        } else {
            Record::new(format!("k{}", i).into_bytes(), format!("v{}", i).into_bytes())
        };
        let position = manager.write(&session, &record).unwrap();
        expected.push((position, record));
    }

    let scanned: Vec<_> = manager
        .scan(&session)
        .unwrap()
        .collect::<bytesdb::Result<_>>()
        .unwrap();

    assert_eq!(scanned, expected);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_appends_tombstone() {
    let (_temp, manager) = setup_manager(1024 * 1024);
    let session = session();

    let put = manager
        .write(&session, &Record::new(&b"key"[..], &b"value"[..]))
        .unwrap();
    let before = manager.size(&session).unwrap();

    let del = manager.delete(&session, &b"key"[..]).unwrap();
    let after = manager.size(&session).unwrap();

    let expected_len = Record::tombstone(&b"key"[..]).encoded_len() as u64;
    assert_eq!(del.size, expected_len);
    assert_eq!(after, before + expected_len);
    assert_eq!(del.position, before);

    // Earlier bytes untouched
    assert_eq!(manager.read(&session, &put).unwrap().value, &b"value"[..]);

    let tombstone = manager.read(&session, &del).unwrap();
    assert_eq!(tombstone.typ, RecordType::Deleted);
    assert_eq!(tombstone.key, &b"key"[..]);
    assert!(tombstone.value.is_empty());
}

// =============================================================================
// Remove Tests
// =============================================================================

#[test]
fn test_remove_all_data_then_recreate() {
    let (temp, manager) = setup_manager(128);
    let session = session();

    for i in 0..20 {
        manager
            .write(&session, &Record::new(format!("k{}", i).into_bytes(), vec![0u8; 16]))
            .unwrap();
    }
    let dir = table_dir(temp.path(), &session);
    assert!(dir.is_dir());

    manager.remove_all_data(&session).unwrap();
    assert!(!dir.exists());
    assert!(!manager.contains(&session));

    let position = manager
        .write(&session, &Record::new(&b"fresh"[..], &b"start"[..]))
        .unwrap();
    assert!(dir.is_dir());
    assert_eq!(position.segment, 0);
    assert_eq!(position.position, 0);
    assert_eq!(manager.size(&session).unwrap(), position.size);
    assert_eq!(manager.segments(&session).unwrap().len(), 1);
}

#[test]
fn test_remove_all_data_of_unknown_table() {
    let (temp, manager) = setup_manager(1024);
    let session = Session::new("never", "written");

    manager.remove_all_data(&session).unwrap();

    assert!(!table_dir(temp.path(), &session).exists());
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_persists_for_new_manager() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().root_path(temp.path()).build();
    let session = session();
    let record = Record::new(&b"durable"[..], &b"bytes"[..]);

    let position = {
        let manager = StorageManager::new(&config).unwrap();
        let position = manager.write(&session, &record).unwrap();
        manager.flush_all().unwrap();
        manager.close().unwrap();
        assert!(manager.sessions().is_empty());
        position
    };

    let manager = StorageManager::new(&config).unwrap();
    assert_eq!(manager.read(&session, &position).unwrap(), record);
    assert_eq!(manager.size(&session).unwrap(), position.size);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_get_disjoint_positions() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 200;

    let (_temp, manager) = setup_manager(4096);
    let session = session();

    let results: Vec<Vec<(Record, bytesdb::RecordPosition)>> = crossbeam::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let manager = &manager;
                let session = &session;
                s.spawn(move |_| {
                    (0..PER_THREAD)
                        .map(|i| {
                            let record = Record::new(
                                format!("thread{}_key{}", t, i).into_bytes(),
                                format!("thread{}_value{}", t, i).into_bytes(),
                            );
                            let position = manager.write(session, &record).unwrap();
                            (record, position)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    let all: Vec<_> = results.into_iter().flatten().collect();
    assert_eq!(all.len(), THREADS * PER_THREAD);

    // No two records share a byte within a segment
    let mut ranges: Vec<(u64, u64, u64)> = all
        .iter()
        .map(|(_, p)| (p.segment, p.position, p.position + p.size))
        .collect();
    ranges.sort();
    for pair in ranges.windows(2) {
        let (seg_a, _, end_a) = pair[0];
        let (seg_b, start_b, _) = pair[1];
        if seg_a == seg_b {
            assert!(end_a <= start_b, "overlap: {:?}", pair);
        }
    }

    let unique: HashSet<_> = all.iter().map(|(_, p)| *p).collect();
    assert_eq!(unique.len(), all.len());

    for (record, position) in &all {
        assert_eq!(&manager.read(&session, position).unwrap(), record);
    }
}

#[test]
fn test_concurrent_first_access_creates_one_store() {
    const THREADS: u64 = 8;

    let (_temp, manager) = setup_manager(1024 * 1024);
    let session = session();

    let mut positions: Vec<bytesdb::RecordPosition> = crossbeam::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let manager = &manager;
                let session = &session;
                s.spawn(move |_| {
                    let record = Record::new(format!("k{}", t).into_bytes(), vec![0u8; 32]);
                    manager.write(session, &record).unwrap()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    // A second store for the same table would hand out offsets from its
    // own cached size, so positions would collide.
    positions.sort_by_key(|p| p.position);
    let mut expected_offset = 0;
    for position in &positions {
        assert_eq!(position.segment, 0);
        assert_eq!(position.position, expected_offset);
        expected_offset += position.size;
    }

    assert_eq!(manager.size(&session).unwrap(), expected_offset);
    assert_eq!(manager.sessions().len(), 1);
}
