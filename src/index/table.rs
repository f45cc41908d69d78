//! Offset Index
//!
//! In-memory id -> entry map kept in step with the index file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::codec::RecordId;
use crate::config::SyncStrategy;
use crate::error::{Result, StoreError};
use crate::log::{SlotLog, SlotStatus};

use super::file::{FileLoad, IndexFile, IndexRecord};

/// One live entry of the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: RecordId,

    /// Offset of the record's slot in the log
    pub log_offset: u64,

    /// Encoded projected fields
    pub projected: Vec<u8>,

    /// Position of this entry's record in the index file
    position: u64,
}

/// What `OffsetIndex::open` found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Persisted index loaded with this many entries
    Loaded(usize),

    /// No index file
    Missing,

    /// Index file present but unusable
    Invalid(String),
}

impl LoadOutcome {
    pub fn needs_rebuild(&self) -> bool {
        !matches!(self, LoadOutcome::Loaded(_))
    }
}

/// Counters from a rebuild pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Entries in the rebuilt index
    pub live: usize,

    /// DELETED slots passed over
    pub deleted: usize,

    /// Slots skipped because they were corrupt or undecodable
    pub skipped: usize,
}

/// Persistent id -> (offset, projected fields) mapping
///
/// ## Concurrency:
/// - `entries`: RwLock, shared for lookups, exclusive for mutation
/// - `file`: Mutex, always taken after `entries` (never the other way)
pub struct OffsetIndex {
    path: PathBuf,
    capacity: usize,
    sync_strategy: SyncStrategy,
    entries: RwLock<HashMap<RecordId, IndexEntry>>,
    file: Mutex<IndexFile>,

    /// Fail the next file write (rollback tests)
    #[cfg(test)]
    fail_next_write: std::sync::atomic::AtomicBool,
}

impl OffsetIndex {
    /// Open the index at `path`
    ///
    /// Loads the persisted index when it is trustworthy. Otherwise starts
    /// from a fresh empty index file and reports why, so the caller can
    /// run `rebuild_from_log`.
    pub fn open(path: &Path, capacity: usize, sync_strategy: SyncStrategy) -> Result<(Self, LoadOutcome)> {
        let (file, records, outcome) = match IndexFile::load(path, capacity, sync_strategy)? {
            FileLoad::Loaded(file, records) => {
                let count = records.len();
                (file, records, LoadOutcome::Loaded(count))
            }
            FileLoad::Missing => {
                let (file, _) = IndexFile::rewrite(path, capacity, sync_strategy, &[])?;
                (file, Vec::new(), LoadOutcome::Missing)
            }
            FileLoad::Invalid(reason) => {
                tracing::warn!(path = %path.display(), reason = %reason, "Discarding index file");
                let (file, _) = IndexFile::rewrite(path, capacity, sync_strategy, &[])?;
                (file, Vec::new(), LoadOutcome::Invalid(reason))
            }
        };

        let entries = records
            .into_iter()
            .map(|(position, record)| {
                (
                    record.id,
                    IndexEntry {
                        id: record.id,
                        log_offset: record.log_offset,
                        projected: record.projected,
                        position,
                    },
                )
            })
            .collect();

        Ok((
            Self {
                path: path.to_path_buf(),
                capacity,
                sync_strategy,
                entries: RwLock::new(entries),
                file: Mutex::new(file),
                #[cfg(test)]
                fail_next_write: std::sync::atomic::AtomicBool::new(false),
            },
            outcome,
        ))
    }

    /// Rebuild the index by scanning the log
    ///
    /// `derive` turns an ACTIVE slot's payload into (id, projected bytes).
    /// Corrupt or undecodable slots are logged and skipped; I/O errors
    /// abort the rebuild and leave the current index untouched.
    pub fn rebuild_from_log<F>(&self, log: &SlotLog, mut derive: F) -> Result<RebuildStats>
    where
        F: FnMut(&[u8]) -> Result<(RecordId, Vec<u8>)>,
    {
        let mut stats = RebuildStats::default();
        let mut latest: HashMap<RecordId, IndexRecord> = HashMap::new();

        for slot in log.scan()? {
            let slot = match slot {
                Ok(s) => s,
                Err(e) if e.is_data_error() => {
                    tracing::warn!(error = %e, "Skipping unreadable slot during index rebuild");
                    stats.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if slot.status == SlotStatus::Deleted {
                stats.deleted += 1;
                continue;
            }

            let (id, projected) = match derive(&slot.payload) {
                Ok(derived) => derived,
                Err(e) => {
                    tracing::warn!(offset = slot.offset, error = %e, "Skipping undecodable record during index rebuild");
                    stats.skipped += 1;
                    continue;
                }
            };
            if projected.len() > self.capacity {
                tracing::warn!(
                    offset = slot.offset,
                    id = %id,
                    len = projected.len(),
                    capacity = self.capacity,
                    "Skipping record whose projection exceeds index capacity"
                );
                stats.skipped += 1;
                continue;
            }

            let record = IndexRecord {
                id,
                log_offset: slot.offset,
                projected,
            };
            if let Some(previous) = latest.insert(id, record) {
                tracing::warn!(
                    id = %id,
                    previous = previous.log_offset,
                    offset = slot.offset,
                    "Duplicate active slot for id, keeping the later one"
                );
            }
        }

        let mut records: Vec<IndexRecord> = latest.into_values().collect();
        records.sort_by_key(|r| r.log_offset);
        stats.live = records.len();

        self.install(records)?;

        if stats.skipped > 0 {
            tracing::warn!(skipped = stats.skipped, live = stats.live, "Index rebuilt with skipped slots");
        } else {
            tracing::info!(live = stats.live, deleted = stats.deleted, "Index rebuilt from log");
        }

        Ok(stats)
    }

    /// Insert a new entry
    pub fn put(&self, id: RecordId, log_offset: u64, projected: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }

        let record = IndexRecord {
            id,
            log_offset,
            projected,
        };
        self.injected_failure()?;
        let position = self.file.lock().append(&record)?;

        entries.insert(
            id,
            IndexEntry {
                id,
                log_offset,
                projected: record.projected,
                position,
            },
        );
        Ok(())
    }

    /// Update an entry's offset and projection in place
    pub fn update(&self, id: RecordId, log_offset: u64, projected: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        let record = IndexRecord {
            id,
            log_offset,
            projected,
        };
        self.injected_failure()?;
        self.file.lock().overwrite(entry.position, &record)?;

        entry.log_offset = log_offset;
        entry.projected = record.projected;
        Ok(())
    }

    /// Tombstone an entry on disk and drop it from memory
    pub fn remove(&self, id: RecordId) -> Result<IndexEntry> {
        let mut entries = self.entries.write();
        let position = entries.get(&id).ok_or(StoreError::NotFound(id))?.position;

        self.injected_failure()?;
        self.file.lock().tombstone(position, id)?;

        entries.remove(&id).ok_or(StoreError::NotFound(id))
    }

    /// Look up an entry
    pub fn get(&self, id: RecordId) -> Result<IndexEntry> {
        self.entries
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Snapshot of every entry (not a live view)
    pub fn all(&self) -> Vec<IndexEntry> {
        self.entries.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Replace every entry with `records`, rewriting the index file
    ///
    /// Used after a rebuild and after compaction moved every slot.
    pub fn install(&self, records: Vec<IndexRecord>) -> Result<()> {
        let mut entries = self.entries.write();
        let mut file = self.file.lock();

        let (new_file, positions) =
            IndexFile::rewrite(&self.path, self.capacity, self.sync_strategy, &records)?;

        *file = new_file;
        *entries = records
            .into_iter()
            .zip(positions)
            .map(|(record, position)| {
                (
                    record.id,
                    IndexEntry {
                        id: record.id,
                        log_offset: record.log_offset,
                        projected: record.projected,
                        position,
                    },
                )
            })
            .collect();

        tracing::debug!(path = %file.path().display(), entries = entries.len(), "Installed index file");
        Ok(())
    }

    /// Flush the index file
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync()
    }

    /// Flush and mark the index cleanly closed
    pub fn persist(&self) -> Result<()> {
        self.file.lock().set_clean(true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub(crate) fn fail_next_write(&self) {
        self.fail_next_write
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn injected_failure(&self) -> Result<()> {
        if self
            .fail_next_write
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected index write failure",
            )));
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[inline]
    fn injected_failure(&self) -> Result<()> {
        Ok(())
    }
}
