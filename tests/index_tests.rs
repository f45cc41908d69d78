//! Tests for the Offset Index
//!
//! These tests verify:
//! - put / get / update / remove semantics
//! - Clean-close persistence and reload
//! - Every reason a persisted index is discarded
//! - Rebuilding from a slot log

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use slotstore::config::SyncStrategy;
use slotstore::index::{LoadOutcome, OffsetIndex, HEADER_SIZE};
use slotstore::log::SlotLog;
use slotstore::{RecordId, StoreError};
use tempfile::TempDir;

const CAPACITY: usize = 32;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_index() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("records.idx");
    (temp_dir, path)
}

fn open_index(path: &Path) -> (OffsetIndex, LoadOutcome) {
    OffsetIndex::open(path, CAPACITY, SyncStrategy::EveryWrite).unwrap()
}

fn poke(path: &Path, pos: u64, bytes: &[u8]) {
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(pos)).unwrap();
    file.write_all(bytes).unwrap();
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_missing_creates_empty() {
    let (_temp, path) = setup_temp_index();
    let (index, outcome) = open_index(&path);

    assert_eq!(outcome, LoadOutcome::Missing);
    assert!(outcome.needs_rebuild());
    assert!(index.is_empty());
    assert!(path.exists());
}

#[test]
fn test_put_and_get() {
    let (_temp, path) = setup_temp_index();
    let (index, _) = open_index(&path);
    let id = RecordId::new();

    index.put(id, 128, vec![1, 2, 3]).unwrap();

    let entry = index.get(id).unwrap();
    assert_eq!(entry.id, id);
    assert_eq!(entry.log_offset, 128);
    assert_eq!(entry.projected, vec![1, 2, 3]);
    assert!(index.contains(id));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_put_duplicate_fails() {
    let (_temp, path) = setup_temp_index();
    let (index, _) = open_index(&path);
    let id = RecordId::new();

    index.put(id, 0, Vec::new()).unwrap();
    let err = index.put(id, 64, Vec::new()).unwrap_err();

    assert!(matches!(err, StoreError::AlreadyExists(dup) if dup == id));
    assert_eq!(index.get(id).unwrap().log_offset, 0);
}

#[test]
fn test_get_missing_is_not_found() {
    let (_temp, path) = setup_temp_index();
    let (index, _) = open_index(&path);

    assert!(index.get(RecordId::new()).unwrap_err().is_not_found());
}

#[test]
fn test_update_replaces_offset_and_projection() {
    let (_temp, path) = setup_temp_index();
    let (index, _) = open_index(&path);
    let id = RecordId::new();

    index.put(id, 0, vec![1]).unwrap();
    index.update(id, 256, vec![9, 9]).unwrap();

    let entry = index.get(id).unwrap();
    assert_eq!(entry.log_offset, 256);
    assert_eq!(entry.projected, vec![9, 9]);
    assert_eq!(index.len(), 1);
}

#[test]
fn test_update_missing_fails() {
    let (_temp, path) = setup_temp_index();
    let (index, _) = open_index(&path);

    assert!(matches!(
        index.update(RecordId::new(), 0, Vec::new()),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn test_remove() {
    let (_temp, path) = setup_temp_index();
    let (index, _) = open_index(&path);
    let id = RecordId::new();

    index.put(id, 0, Vec::new()).unwrap();
    let removed = index.remove(id).unwrap();

    assert_eq!(removed.id, id);
    assert!(!index.contains(id));
    assert!(matches!(index.remove(id), Err(StoreError::NotFound(_))));
}

#[test]
fn test_projection_over_capacity_rejected() {
    let (_temp, path) = setup_temp_index();
    let (index, _) = open_index(&path);

    let err = index.put(RecordId::new(), 0, vec![0u8; CAPACITY + 1]).unwrap_err();
    assert!(matches!(err, StoreError::PayloadTooLarge { .. }));
    assert!(index.is_empty());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_clean_close_reloads() {
    let (_temp, path) = setup_temp_index();
    let keep = RecordId::new();
    let gone = RecordId::new();
    {
        let (index, _) = open_index(&path);
        index.put(keep, 0, vec![7]).unwrap();
        index.put(gone, 64, vec![8]).unwrap();
        index.update(keep, 128, vec![6]).unwrap();
        index.remove(gone).unwrap();
        index.persist().unwrap();
    }

    let (index, outcome) = open_index(&path);

    assert_eq!(outcome, LoadOutcome::Loaded(1));
    assert_eq!(index.get(keep).unwrap().log_offset, 128);
    assert_eq!(index.get(keep).unwrap().projected, vec![6]);
    assert!(!index.contains(gone));
}

#[test]
fn test_reload_then_mutate_then_reload() {
    let (_temp, path) = setup_temp_index();
    let a = RecordId::new();
    let b = RecordId::new();
    {
        let (index, _) = open_index(&path);
        index.put(a, 0, Vec::new()).unwrap();
        index.persist().unwrap();
    }
    {
        let (index, _) = open_index(&path);
        index.put(b, 64, Vec::new()).unwrap();
        index.remove(a).unwrap();
        index.persist().unwrap();
    }

    let (index, outcome) = open_index(&path);
    assert_eq!(outcome, LoadOutcome::Loaded(1));
    assert!(index.contains(b));
    assert!(!index.contains(a));
}

#[test]
fn test_unclean_close_is_invalid() {
    let (_temp, path) = setup_temp_index();
    {
        let (index, _) = open_index(&path);
        index.put(RecordId::new(), 0, Vec::new()).unwrap();
        // No persist: simulates a crash
    }

    let (index, outcome) = open_index(&path);
    assert!(matches!(outcome, LoadOutcome::Invalid(_)));
    assert!(index.is_empty());
}

#[test]
fn test_persist_flushes_batched_records() {
    let (_temp, path) = setup_temp_index();
    let ids: Vec<RecordId> = (0..5).map(|_| RecordId::new()).collect();
    {
        let (index, _) =
            OffsetIndex::open(&path, CAPACITY, SyncStrategy::EveryNEntries { count: 100 }).unwrap();
        for (i, id) in ids.iter().enumerate() {
            index.put(*id, (i * 64) as u64, Vec::new()).unwrap();
        }
        index.persist().unwrap();
    }

    let (index, outcome) = open_index(&path);
    assert_eq!(outcome, LoadOutcome::Loaded(ids.len()));
    for id in &ids {
        assert!(index.contains(*id));
    }
}

#[test]
fn test_bad_magic_is_invalid() {
    let (_temp, path) = setup_temp_index();
    {
        let (index, _) = open_index(&path);
        index.persist().unwrap();
    }
    poke(&path, 0, b"XXXX");

    let (_, outcome) = open_index(&path);
    assert!(matches!(outcome, LoadOutcome::Invalid(_)));
}

#[test]
fn test_empty_file_is_invalid() {
    let (_temp, path) = setup_temp_index();
    std::fs::write(&path, b"").unwrap();

    let (_, outcome) = open_index(&path);
    assert!(matches!(outcome, LoadOutcome::Invalid(_)));
}

#[test]
fn test_capacity_change_is_invalid() {
    let (_temp, path) = setup_temp_index();
    {
        let (index, _) = open_index(&path);
        index.persist().unwrap();
    }

    let (_, outcome) = OffsetIndex::open(&path, CAPACITY * 2, SyncStrategy::EveryWrite).unwrap();
    assert!(matches!(outcome, LoadOutcome::Invalid(_)));
}

#[test]
fn test_checksum_mismatch_is_invalid() {
    let (_temp, path) = setup_temp_index();
    {
        let (index, _) = open_index(&path);
        index.put(RecordId::new(), 0, vec![1, 2, 3]).unwrap();
        index.persist().unwrap();
    }
    // Flip a byte inside the first record's offset field
    poke(&path, HEADER_SIZE + 16, &[0xAB]);

    let (_, outcome) = open_index(&path);
    assert!(matches!(outcome, LoadOutcome::Invalid(_)));
}

#[test]
fn test_truncated_record_is_invalid() {
    let (_temp, path) = setup_temp_index();
    {
        let (index, _) = open_index(&path);
        index.put(RecordId::new(), 0, Vec::new()).unwrap();
        index.persist().unwrap();
    }
    let len = std::fs::metadata(&path).unwrap().len();
    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(len - 3)
        .unwrap();

    let (_, outcome) = open_index(&path);
    assert!(matches!(outcome, LoadOutcome::Invalid(_)));
}

// =============================================================================
// Rebuild Tests
// =============================================================================

#[test]
fn test_rebuild_from_log() {
    let (temp, path) = setup_temp_index();
    let log = SlotLog::open(&temp.path().join("records.log"), 64, SyncStrategy::EveryWrite).unwrap();

    let a = RecordId::new();
    let b = RecordId::new();
    let c = RecordId::new();
    log.append(a.to_string().as_bytes()).unwrap();
    let b_offset = log.append(b.to_string().as_bytes()).unwrap();
    log.append(c.to_string().as_bytes()).unwrap();
    log.append(b"garbage").unwrap();
    log.tombstone_at(b_offset).unwrap();

    let (index, _) = open_index(&path);
    let stats = index
        .rebuild_from_log(&log, |payload| {
            let text = std::str::from_utf8(payload)
                .map_err(|e| StoreError::Decoding(e.to_string()))?;
            Ok((text.parse()?, vec![payload[0]]))
        })
        .unwrap();

    assert_eq!(stats.live, 2);
    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(index.get(a).unwrap().log_offset, 0);
    assert_eq!(index.get(c).unwrap().log_offset, 128);
    assert!(!index.contains(b));
}

#[test]
fn test_rebuild_replaces_existing_entries() {
    let (temp, path) = setup_temp_index();
    let log = SlotLog::open(&temp.path().join("records.log"), 64, SyncStrategy::EveryWrite).unwrap();
    let (index, _) = open_index(&path);

    let stale = RecordId::new();
    index.put(stale, 0, Vec::new()).unwrap();

    let stats = index
        .rebuild_from_log(&log, |_| Err(StoreError::Decoding("unused".to_string())))
        .unwrap();

    assert_eq!(stats.live, 0);
    assert!(index.is_empty());

    index.persist().unwrap();
    drop(index);
    let (_, outcome) = open_index(&path);
    assert_eq!(outcome, LoadOutcome::Loaded(0));
}
