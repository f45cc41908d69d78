//! Compaction Module
//!
//! Reclaims space held by tombstoned and orphaned slots.
//!
//! ## Algorithm
//! 1. Walk the offset index (the authoritative live set), in log order
//! 2. Copy each live slot, byte for byte, into `records.log.compact`
//! 3. fsync the new file, then rename it over the old log
//! 4. Rewrite the index with the new offsets
//!
//! The old log is never modified: until the rename, a crash leaves it in
//! place (worst case: a stray `.compact` file). A crash between the
//! rename and the index rewrite leaves the index marked dirty, so the next
//! open rebuilds it from the new log.
//!
//! Errors come in two kinds. Anything before the rename is returned as
//! is and nothing has changed. Anything after it is
//! `StoreError::Compaction`, telling the caller to rebuild the index.
//!
//! The caller holds the collection's gate exclusively for the whole run.

mod scheduler;

pub use scheduler::{CompactionScheduler, CompactionTarget};

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use crate::error::{Result, StoreError};
use crate::index::{IndexRecord, OffsetIndex};
use crate::log::{decode_slot, SlotLog, SlotStatus};

/// Counters from one compaction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Records copied into the new log
    pub live_records: usize,

    /// Slots in the log before / after
    pub slots_before: u64,
    pub slots_after: u64,

    /// Log size in bytes before / after
    pub bytes_before: u64,
    pub bytes_after: u64,

    /// Index entries whose slot could not be copied (dropped)
    pub skipped: usize,
}

impl CompactionStats {
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

/// Rewrite `log` keeping only slots referenced by `index`
pub(crate) fn compact_log(log: &SlotLog, index: &OffsetIndex) -> Result<CompactionStats> {
    let started = Instant::now();
    let slot_size = log.slot_size() as u64;
    let mut stats = CompactionStats {
        slots_before: log.slot_count(),
        bytes_before: log.len_bytes(),
        ..Default::default()
    };

    let mut entries = index.all();
    entries.sort_by_key(|e| e.log_offset);

    let tmp_path = log.path().with_extension("log.compact");
    let records = match copy_live_slots(log, &entries, &tmp_path, slot_size, &mut stats) {
        Ok(records) => records,
        Err(e) => {
            discard(&tmp_path);
            return Err(e);
        }
    };

    match log.replace_with(&tmp_path) {
        Ok(()) => {}
        // Already renamed: the index must be rebuilt against the new log
        Err(e @ StoreError::Compaction(_)) => return Err(e),
        Err(e) => {
            discard(&tmp_path);
            return Err(e);
        }
    }

    index.install(records).map_err(|e| {
        StoreError::Compaction(format!("log swapped but index rewrite failed: {}", e))
    })?;

    stats.slots_after = log.slot_count();
    stats.bytes_after = log.len_bytes();

    tracing::info!(
        live = stats.live_records,
        skipped = stats.skipped,
        slots_before = stats.slots_before,
        slots_after = stats.slots_after,
        reclaimed = stats.bytes_reclaimed(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Compaction finished"
    );

    Ok(stats)
}

/// Copy every indexed ACTIVE slot into a fresh file at `tmp_path`
fn copy_live_slots(
    log: &SlotLog,
    entries: &[crate::index::IndexEntry],
    tmp_path: &Path,
    slot_size: u64,
    stats: &mut CompactionStats,
) -> Result<Vec<IndexRecord>> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp_path)?;
    let mut out = BufWriter::new(file);

    let mut records = Vec::with_capacity(entries.len());
    let mut next_offset = 0u64;

    for entry in entries {
        let slot = match log.read_slot(entry.log_offset) {
            Ok(Some(slot)) => slot,
            Ok(None) => {
                tracing::warn!(id = %entry.id, offset = entry.log_offset, "Indexed slot past end of log, dropping");
                stats.skipped += 1;
                continue;
            }
            Err(e) if e.is_data_error() => {
                tracing::warn!(id = %entry.id, error = %e, "Unreadable indexed slot, dropping");
                stats.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        match decode_slot(&slot, entry.log_offset) {
            Ok((SlotStatus::Active, _)) => {}
            Ok((SlotStatus::Deleted, _)) => {
                tracing::warn!(id = %entry.id, offset = entry.log_offset, "Indexed slot is deleted, dropping");
                stats.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(id = %entry.id, error = %e, "Corrupt indexed slot, dropping");
                stats.skipped += 1;
                continue;
            }
        }

        out.write_all(&slot)?;
        records.push(IndexRecord {
            id: entry.id,
            log_offset: next_offset,
            projected: entry.projected.clone(),
        });
        next_offset += slot_size;
    }

    let file: File = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    stats.live_records = records.len();
    if stats.skipped > 0 {
        tracing::warn!(skipped = stats.skipped, "Compaction dropped unreadable records");
    }

    Ok(records)
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove compaction temp file");
        }
    }
}
