//! Tests for the Slot Log
//!
//! These tests verify:
//! - Append / read_at / update_at / tombstone_at
//! - Payload size limits and the NUL rule
//! - Full-file scans (restartable, skipping corrupt slots)
//! - Torn trailing slots on reopen
//! - Slot size pinned by the metadata sidecar
//! - Swapping in a replacement log
//! - Sync strategies

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use slotstore::config::SyncStrategy;
use slotstore::log::{SlotLog, SlotStatus};
use slotstore::StoreError;
use tempfile::TempDir;

const SLOT: usize = 64;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.log");
    (temp_dir, path)
}

fn open_log(path: &PathBuf) -> SlotLog {
    SlotLog::open(path, SLOT, SyncStrategy::EveryWrite).unwrap()
}

// =============================================================================
// Append / Read Tests
// =============================================================================

#[test]
fn test_append_returns_slot_offsets() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    assert_eq!(log.append(b"first").unwrap(), 0);
    assert_eq!(log.append(b"second").unwrap(), SLOT as u64);
    assert_eq!(log.append(b"third").unwrap(), 2 * SLOT as u64);

    assert_eq!(log.slot_count(), 3);
    assert_eq!(log.len_bytes(), 3 * SLOT as u64);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * SLOT as u64);
}

#[test]
fn test_read_at_returns_payload() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    let a = log.append(b"{\"n\":1}").unwrap();
    let b = log.append(b"{\"n\":2}").unwrap();

    assert_eq!(log.read_at(a).unwrap(), b"{\"n\":1}");
    assert_eq!(log.read_at(b).unwrap(), b"{\"n\":2}");
}

#[test]
fn test_payload_exactly_fills_slot() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    let payload = vec![b'z'; SLOT - 1];
    let offset = log.append(&payload).unwrap();

    assert_eq!(log.read_at(offset).unwrap(), payload);
}

#[test]
fn test_payload_too_large() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    let err = log.append(&vec![b'z'; SLOT]).unwrap_err();

    assert!(matches!(err, StoreError::PayloadTooLarge { len, max } if len == SLOT && max == SLOT - 1));
    assert_eq!(log.slot_count(), 0);
}

#[test]
fn test_payload_with_nul_rejected() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    assert!(matches!(log.append(b"ab\0cd"), Err(StoreError::Encoding(_))));
    assert_eq!(log.slot_count(), 0);
}

#[test]
fn test_read_past_end_is_corrupt() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);
    log.append(b"only").unwrap();

    assert!(matches!(
        log.read_at(SLOT as u64),
        Err(StoreError::CorruptSlot { .. })
    ));
}

#[test]
fn test_unaligned_offset_is_corrupt() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);
    log.append(b"only").unwrap();

    assert!(matches!(log.read_at(3), Err(StoreError::CorruptSlot { offset: 3, .. })));
}

// =============================================================================
// Update / Tombstone Tests
// =============================================================================

#[test]
fn test_update_in_place() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    let a = log.append(b"a long original payload").unwrap();
    let b = log.append(b"neighbour").unwrap();

    log.update_at(a, b"short").unwrap();

    assert_eq!(log.read_at(a).unwrap(), b"short");
    assert_eq!(log.read_at(b).unwrap(), b"neighbour");
    assert_eq!(log.slot_count(), 2);
}

#[test]
fn test_update_past_end_fails() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    assert!(matches!(
        log.update_at(0, b"nothing here"),
        Err(StoreError::CorruptSlot { .. })
    ));
}

#[test]
fn test_tombstone_marks_deleted() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    let a = log.append(b"doomed").unwrap();
    let b = log.append(b"survivor").unwrap();
    log.tombstone_at(a).unwrap();

    assert!(matches!(log.read_at(a), Err(StoreError::DeletedRecord { offset: 0 })));
    assert_eq!(log.read_at(b).unwrap(), b"survivor");
    // Space is not reclaimed
    assert_eq!(log.slot_count(), 2);
}

#[test]
fn test_unknown_status_byte_is_corrupt() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);
    let offset = log.append(b"payload").unwrap();
    drop(log);

    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&[0x7f]).unwrap();
    drop(file);

    let log = open_log(&path);
    assert!(matches!(log.read_at(offset), Err(StoreError::CorruptSlot { .. })));
}

#[test]
fn test_reactivate_undoes_tombstone() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);
    let offset = log.append(b"back again").unwrap();

    log.tombstone_at(offset).unwrap();
    log.reactivate_at(offset).unwrap();

    assert_eq!(log.read_at(offset).unwrap(), b"back again");
}

#[test]
fn test_restore_slot_puts_back_raw_bytes() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);
    let offset = log.append(b"before").unwrap();
    let saved = log.read_slot(offset).unwrap().unwrap();

    log.update_at(offset, b"after, and longer").unwrap();
    log.restore_slot(offset, &saved).unwrap();

    assert_eq!(log.read_at(offset).unwrap(), b"before");
    assert!(matches!(
        log.restore_slot(offset, &saved[..10]),
        Err(StoreError::CorruptSlot { .. })
    ));
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_empty_log() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    assert_eq!(log.scan().unwrap().count(), 0);
}

#[test]
fn test_scan_reports_status_and_payload() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);

    log.append(b"one").unwrap();
    let two = log.append(b"two").unwrap();
    log.append(b"three").unwrap();
    log.tombstone_at(two).unwrap();

    let slots: Vec<_> = log.scan().unwrap().collect::<Result<Vec<_>, _>>().unwrap();

    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0].offset, 0);
    assert_eq!(slots[0].status, SlotStatus::Active);
    assert_eq!(slots[0].payload, b"one");
    assert_eq!(slots[1].status, SlotStatus::Deleted);
    assert_eq!(slots[2].offset, 2 * SLOT as u64);
    assert_eq!(slots[2].payload, b"three");
}

#[test]
fn test_scan_is_restartable() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);
    for i in 0..5 {
        log.append(format!("p{}", i).as_bytes()).unwrap();
    }

    let mut first = log.scan().unwrap();
    first.next();
    first.next();

    let second: Vec<_> = log.scan().unwrap().collect();
    assert_eq!(second.len(), 5);
    assert_eq!(second[0].as_ref().unwrap().offset, 0);
}

#[test]
fn test_scan_continues_past_corrupt_slot() {
    let (_temp, path) = setup_temp_log();
    let log = open_log(&path);
    log.append(b"good1").unwrap();
    let bad = log.append(b"bad").unwrap();
    log.append(b"good2").unwrap();

    {
        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(bad)).unwrap();
        file.write_all(&[0xEE]).unwrap();
    }

    let results: Vec<_> = log.scan().unwrap().collect();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(StoreError::CorruptSlot { .. })));
    assert_eq!(results[2].as_ref().unwrap().payload, b"good2");
}

// =============================================================================
// Reopen Tests
// =============================================================================

#[test]
fn test_reopen_preserves_slots() {
    let (_temp, path) = setup_temp_log();
    {
        let log = open_log(&path);
        log.append(b"kept").unwrap();
        log.append(b"also kept").unwrap();
    }

    let log = open_log(&path);
    assert_eq!(log.slot_count(), 2);
    assert_eq!(log.read_at(SLOT as u64).unwrap(), b"also kept");
    assert_eq!(log.append(b"next").unwrap(), 2 * SLOT as u64);
}

#[test]
fn test_torn_trailing_slot_truncated_on_open() {
    let (_temp, path) = setup_temp_log();
    {
        let log = open_log(&path);
        log.append(b"complete").unwrap();
    }

    // Simulate a crash halfway through the second append
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0x01, b'h', b'a', b'l', b'f']).unwrap();
    }

    let log = open_log(&path);
    assert_eq!(log.slot_count(), 1);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), SLOT as u64);
    assert_eq!(log.append(b"after").unwrap(), SLOT as u64);
}

#[test]
fn test_metadata_written_on_create() {
    let (_temp, path) = setup_temp_log();
    let _log = open_log(&path);

    let meta = std::fs::read(slotstore::log::meta_path(&path)).unwrap();
    assert_eq!(meta.len(), slotstore::log::META_SIZE);
    assert_eq!(&meta[0..4], slotstore::log::META_MAGIC);
}

#[test]
fn test_other_slot_size_refused() {
    let (_temp, path) = setup_temp_log();
    {
        let log = open_log(&path);
        log.append(b"one").unwrap();
        log.append(b"two").unwrap();
        log.append(b"three").unwrap();
    }

    let result = SlotLog::open(&path, 2 * SLOT, SyncStrategy::EveryWrite);

    assert!(matches!(result, Err(StoreError::Config(_))));
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * SLOT as u64);
    assert_eq!(open_log(&path).slot_count(), 3);
}

// =============================================================================
// Replacement Tests
// =============================================================================

#[test]
fn test_replace_with_swaps_handle() {
    let (temp, path) = setup_temp_log();
    let log = open_log(&path);
    log.append(b"old-1").unwrap();
    log.append(b"old-2").unwrap();

    let replacement = temp.path().join("replacement.log");
    {
        let other = SlotLog::open(&replacement, SLOT, SyncStrategy::EveryWrite).unwrap();
        other.append(b"new").unwrap();
    }

    log.replace_with(&replacement).unwrap();

    assert!(!replacement.exists());
    assert_eq!(log.slot_count(), 1);
    assert_eq!(log.read_at(0).unwrap(), b"new");

    // Appends land in the file now at `path`
    assert_eq!(log.append(b"next").unwrap(), SLOT as u64);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * SLOT as u64);
}

#[test]
fn test_replace_with_partial_slot_leaves_log_alone() {
    let (temp, path) = setup_temp_log();
    let log = open_log(&path);
    log.append(b"kept").unwrap();

    let replacement = temp.path().join("replacement.log");
    std::fs::write(&replacement, vec![0x01u8; SLOT + 3]).unwrap();

    assert!(log.replace_with(&replacement).is_err());

    assert_eq!(log.read_at(0).unwrap(), b"kept");
    assert_eq!(log.append(b"more").unwrap(), SLOT as u64);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * SLOT as u64);
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_sync_every_write() {
    let (_temp, path) = setup_temp_log();
    let log = SlotLog::open(&path, SLOT, SyncStrategy::EveryWrite).unwrap();

    log.append(b"x").unwrap();
    assert_eq!(log.unsynced_count(), 0);
}

#[test]
fn test_sync_every_n_entries() {
    let (_temp, path) = setup_temp_log();
    let log = SlotLog::open(&path, SLOT, SyncStrategy::EveryNEntries { count: 3 }).unwrap();

    log.append(b"a").unwrap();
    log.append(b"b").unwrap();
    assert_eq!(log.unsynced_count(), 2);

    log.append(b"c").unwrap();
    assert_eq!(log.unsynced_count(), 0);

    log.tombstone_at(0).unwrap();
    assert_eq!(log.unsynced_count(), 1);

    log.sync().unwrap();
    assert_eq!(log.unsynced_count(), 0);
}
