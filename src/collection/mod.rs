//! Collection Module
//!
//! The public orchestrator: codec + slot log + offset index + registry
//! behind one CRUD contract.
//!
//! ## Responsibilities
//! - Open/create the collection's files, load or rebuild the index
//! - Create/Read/Update/Delete/ReadAll with concurrency control
//! - Keep index and registry in step with the log, undoing the log write
//!   when the index step fails
//! - Hold the data directory's `LOCK` file: one open collection per directory
//! - Own the background compaction lifecycle

mod locks;

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fs2::FileExt;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{
    decode_projection, encode_projection, Codec, JsonCodec, NoProjection, Projector, Record,
    RecordId,
};
use crate::compaction::{compact_log, CompactionScheduler, CompactionStats, CompactionTarget};
use crate::config::{Config, LockStrategy};
use crate::error::{Result, StoreError};
use crate::index::{IndexEntry, LoadOutcome, OffsetIndex, RebuildStats};
use crate::log::{SlotLog, SlotStatus};
use crate::registry::Registry;

use locks::{LockTable, WriteGuard};

/// Point-in-time counters for a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    /// Live records (index size)
    pub records: usize,

    /// Slots in the log, live + tombstoned
    pub log_slots: u64,

    /// Log size in bytes
    pub log_bytes: u64,

    /// Records currently cached
    pub registry_entries: usize,

    pub registry_hits: u64,
    pub registry_misses: u64,
}

/// Result of `Collection::verify`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Live entries in the index
    pub indexed: usize,

    /// ACTIVE slots the index points at
    pub active: usize,

    /// DELETED slots awaiting compaction
    pub deleted: usize,

    /// Slots with a bad status byte or empty payload
    pub corrupt: usize,

    /// ACTIVE slots the codec cannot decode
    pub undecodable: usize,

    /// ACTIVE slots the index does not reference
    pub orphaned: usize,
}

impl VerifyReport {
    /// Every slot accounted for and every index entry backed by a slot
    pub fn is_consistent(&self) -> bool {
        self.corrupt == 0 && self.undecodable == 0 && self.orphaned == 0 && self.active == self.indexed
    }
}

/// A persistent collection of records
///
/// ## Concurrency Model
///
/// - `gate` (RwLock): readers (read/read_all/count) share it; compaction
///   and index rebuild hold it exclusively
/// - Writers, `LockStrategy::Coarse`: gate exclusive
/// - Writers, `LockStrategy::PerRecord`: gate shared, then the record's
///   stripe mutex. Registry misses also take the stripe while populating
///   so a concurrent update can't be overwritten by a stale read
/// - Lock order is always gate -> stripe -> index -> log
///
/// ## Ownership
///
/// The engine state lives in a `Core` shared with the background
/// compaction thread. The thread never holds the `Collection` itself, so
/// dropping the last handle always runs on the owner's side: it stops
/// and joins the thread, closes the files and releases the directory
/// lock before returning.
pub struct Collection<R, C = JsonCodec<R>, P = NoProjection>
where
    R: Record,
    C: Codec<R>,
    P: Projector<R>,
{
    core: Arc<Core<R, C, P>>,
    compactor: Mutex<Option<CompactionScheduler>>,
}

/// Engine state behind a `Collection`
struct Core<R, C, P>
where
    R: Record,
    C: Codec<R>,
    P: Projector<R>,
{
    config: Config,
    codec: C,
    projector: P,

    /// Record log (exclusive owner of the file)
    log: SlotLog,

    /// id -> offset + projected fields
    index: OffsetIndex,

    /// Materialized records
    registry: Registry<R>,

    gate: RwLock<()>,
    record_locks: Option<LockTable>,
    closed: AtomicBool,

    /// Exclusive lock on `{data_dir}/LOCK`, released on close
    dir_lock: File,
}

impl<R, C, P> Collection<R, C, P>
where
    R: Record,
    C: Codec<R>,
    P: Projector<R>,
{
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    pub const LOG_FILENAME: &'static str = "records.log";
    pub const INDEX_FILENAME: &'static str = "records.idx";
    pub const LOCK_FILENAME: &'static str = "LOCK";

    /// Open or create a collection
    ///
    /// On startup:
    /// 1. Create the data directory if it doesn't exist
    /// 2. Take the directory lock (`StoreError::Locked` if another
    ///    collection holds it)
    /// 3. Open the slot log: refuse a log written with another slot size,
    ///    then drop a torn trailing slot
    /// 4. Load the index, or rebuild it from the log when it is missing,
    ///    empty, unclean or unparseable
    ///
    /// Records are not loaded into the registry until first read.
    pub fn open(config: Config, codec: C, projector: P) -> Result<Self> {
        let core = Core::open(config, codec, projector)?;
        Ok(Self {
            core: Arc::new(core),
            compactor: Mutex::new(None),
        })
    }

    /// Open behind an `Arc`, starting background compaction when
    /// `compaction_interval` is configured
    pub fn open_shared(config: Config, codec: C, projector: P) -> Result<Arc<Self>> {
        let interval = config.compaction_interval;
        let collection = Arc::new(Self::open(config, codec, projector)?);
        if let Some(interval) = interval {
            collection.start_background_compaction(interval)?;
        }
        Ok(collection)
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// Store a new record, minting an id if it has none
    ///
    /// Fails with `AlreadyExists` if the id is already indexed. A failed
    /// index insert after a successful append tombstones the new slot.
    pub fn create(&self, record: R) -> Result<R> {
        self.core.create(record)
    }

    /// Fetch a record by id
    pub fn read(&self, id: RecordId) -> Result<R> {
        self.core.read(id)
    }

    /// Every live record, sorted by id (creation order for minted ids)
    ///
    /// Corrupt or undecodable records are logged and skipped.
    pub fn read_all(&self) -> Result<Vec<R>> {
        self.core.collect_where(|_| true)
    }

    /// Replace a record's payload; the id is immutable
    ///
    /// If the index step fails the previous slot contents are written
    /// back, so later reads still see the old record.
    pub fn update(&self, record: R) -> Result<R> {
        self.core.update(record)
    }

    /// Delete a record: tombstone its slot, drop index and registry entries
    ///
    /// If the index step fails the slot is marked ACTIVE again.
    pub fn delete(&self, id: RecordId) -> Result<()> {
        self.core.delete(id)
    }

    /// Number of live records
    pub fn count(&self) -> Result<usize> {
        let _gate = self.core.read_gate()?;
        Ok(self.core.index.len())
    }

    /// Stop background compaction, flush the index, mark it clean and
    /// release the directory lock
    ///
    /// Every later operation fails with `StoreError::Closed`. Idempotent.
    pub fn close(&self) -> Result<()> {
        self.stop_background_compaction();
        self.core.close()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn contains(&self, id: RecordId) -> Result<bool> {
        let _gate = self.core.read_gate()?;
        Ok(self.core.index.contains(id))
    }

    /// Snapshot of live ids, sorted
    pub fn ids(&self) -> Result<Vec<RecordId>> {
        let _gate = self.core.read_gate()?;
        let mut ids: Vec<RecordId> = self.core.index.all().into_iter().map(|e| e.id).collect();
        ids.sort();
        Ok(ids)
    }

    /// Full scan with a caller-supplied predicate
    pub fn find<F>(&self, predicate: F) -> Result<Vec<R>>
    where
        F: Fn(&R) -> bool,
    {
        self.core.collect_where(predicate)
    }

    /// Projected fields of a record, straight from the index
    pub fn projected(&self, id: RecordId) -> Result<P::Fields> {
        let _gate = self.core.read_gate()?;
        let entry = self.core.index.get(id)?;
        decode_projection(&entry.projected)
    }

    /// Records whose projected fields pass `predicate`
    ///
    /// Only matching records are materialized.
    pub fn filter_projected<F>(&self, predicate: F) -> Result<Vec<R>>
    where
        F: Fn(&P::Fields) -> bool,
    {
        self.core.filter_projected(predicate)
    }

    /// Walk the whole log and check it against the index
    ///
    /// Read-only: nothing is repaired, `rebuild_index` does that.
    pub fn verify(&self) -> Result<VerifyReport> {
        self.core.verify()
    }

    pub fn stats(&self) -> Result<CollectionStats> {
        let _gate = self.core.read_gate()?;
        let core = &self.core;
        Ok(CollectionStats {
            records: core.index.len(),
            log_slots: core.log.slot_count(),
            log_bytes: core.log.len_bytes(),
            registry_entries: core.registry.len(),
            registry_hits: core.registry.hits(),
            registry_misses: core.registry.misses(),
        })
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Compact the log now (stop-the-world)
    pub fn compact(&self) -> Result<CompactionStats> {
        self.core.compact()
    }

    /// Force the crash-recovery path: rebuild the index from the log
    pub fn rebuild_index(&self) -> Result<RebuildStats> {
        let _gate = self.core.gate.write();
        self.core.ensure_open()?;
        self.core.rebuild_locked()
    }

    /// Start compacting every `interval` on a background thread
    ///
    /// Replaces a scheduler that is already running.
    pub fn start_background_compaction(&self, interval: Duration) -> Result<()> {
        self.core.ensure_open()?;
        if interval.is_zero() {
            return Err(StoreError::Config(
                "compaction interval must be non-zero".to_string(),
            ));
        }

        let mut compactor = self.compactor.lock();
        if let Some(previous) = compactor.take() {
            previous.stop();
        }
        *compactor = Some(CompactionScheduler::start(Arc::clone(&self.core), interval)?);
        Ok(())
    }

    /// Stop background compaction if it is running and wait for the
    /// thread to exit
    pub fn stop_background_compaction(&self) {
        let scheduler = self.compactor.lock().take();
        if let Some(scheduler) = scheduler {
            scheduler.stop();
        }
    }

    /// Run one compaction on the background thread and wait for it
    pub fn trigger_background_compaction(&self) -> Result<CompactionStats> {
        let compactor = self.compactor.lock();
        match compactor.as_ref() {
            Some(scheduler) => scheduler.trigger(),
            None => Err(StoreError::Compaction(
                "background compaction is not running".to_string(),
            )),
        }
    }

    pub fn background_compaction_running(&self) -> bool {
        self.compactor.lock().is_some()
    }

    /// Flush log and index to stable storage
    pub fn sync(&self) -> Result<()> {
        let _gate = self.core.read_gate()?;
        self.core.log.sync()?;
        self.core.index.sync()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.core.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.core.config.data_dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.core.config.data_dir.join(Self::LOG_FILENAME)
    }

    pub fn index_path(&self) -> PathBuf {
        self.core.config.data_dir.join(Self::INDEX_FILENAME)
    }

    /// Raw index snapshot (for testing and debugging)
    pub fn index_entries(&self) -> Vec<IndexEntry> {
        let mut entries = self.core.index.all();
        entries.sort_by_key(|e| e.id);
        entries
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl<R, C, P> Core<R, C, P>
where
    R: Record,
    C: Codec<R>,
    P: Projector<R>,
{
    fn open(config: Config, codec: C, projector: P) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let dir_lock = acquire_lock(&config.data_dir, Collection::<R, C, P>::LOCK_FILENAME)?;

        let log_path = config.data_dir.join(Collection::<R, C, P>::LOG_FILENAME);
        let index_path = config.data_dir.join(Collection::<R, C, P>::INDEX_FILENAME);

        let log = SlotLog::open(&log_path, config.slot_size, config.sync_strategy)?;
        let (index, outcome) =
            OffsetIndex::open(&index_path, config.projection_capacity, config.sync_strategy)?;

        let record_locks = match config.lock_strategy {
            LockStrategy::Coarse => None,
            LockStrategy::PerRecord { stripes } => Some(LockTable::new(stripes)),
        };

        let core = Self {
            config,
            codec,
            projector,
            log,
            index,
            registry: Registry::new(),
            gate: RwLock::new(()),
            record_locks,
            closed: AtomicBool::new(false),
            dir_lock,
        };

        let outcome = match outcome {
            LoadOutcome::Loaded(count) => match core.check_loaded_index() {
                Ok(()) => LoadOutcome::Loaded(count),
                Err(reason) => {
                    tracing::warn!(reason = %reason, "Persisted index does not match log");
                    LoadOutcome::Invalid(reason)
                }
            },
            other => other,
        };

        // A failed rebuild drops `core` without closing it, so the index
        // stays marked dirty
        if outcome.needs_rebuild() {
            tracing::info!(outcome = ?outcome, "Rebuilding index from log");
            core.rebuild_locked()?;
        }

        tracing::info!(
            data_dir = %core.config.data_dir.display(),
            records = core.index.len(),
            slots = core.log.slot_count(),
            "Collection opened"
        );

        Ok(core)
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    fn create(&self, mut record: R) -> Result<R> {
        let mut id = self.codec.identifier_of(&record);
        if id.is_nil() {
            id = RecordId::new();
            self.codec.set_identifier(&mut record, id);
        }

        let _guard = self.write_guard(&id)?;
        if self.index.contains(id) {
            return Err(StoreError::AlreadyExists(id));
        }

        let payload = self.codec.encode(&record)?;
        let projected = self.project(&record)?;
        let offset = self.log.append(&payload)?;

        if let Err(e) = self.index.put(id, offset, projected) {
            if let Err(undo) = self.log.tombstone_at(offset) {
                tracing::error!(id = %id, offset, error = %undo, "Failed to tombstone orphaned slot");
            }
            return Err(e);
        }
        self.registry.insert(id, record.clone());

        tracing::debug!(id = %id, offset, len = payload.len(), "Created record");
        Ok(record)
    }

    fn read(&self, id: RecordId) -> Result<R> {
        let _gate = self.read_gate()?;
        if let Some(record) = self.registry.get(&id) {
            return Ok(record);
        }
        self.load(id)
    }

    fn update(&self, record: R) -> Result<R> {
        let id = self.codec.identifier_of(&record);
        let _guard = self.write_guard(&id)?;
        let entry = self.index.get(id)?;

        let payload = self.codec.encode(&record)?;
        let projected = self.project(&record)?;
        let previous = self.log.read_slot(entry.log_offset)?;
        self.log.update_at(entry.log_offset, &payload)?;

        if let Err(e) = self.index.update(id, entry.log_offset, projected) {
            let restored = match &previous {
                Some(slot) => self.log.restore_slot(entry.log_offset, slot),
                None => Ok(()),
            };
            if let Err(undo) = restored {
                // Log holds the new payload; make the next read reload it
                tracing::error!(id = %id, offset = entry.log_offset, error = %undo, "Failed to restore previous slot");
                self.registry.remove(&id);
            }
            return Err(e);
        }
        self.registry.insert(id, record.clone());

        tracing::debug!(id = %id, offset = entry.log_offset, len = payload.len(), "Updated record");
        Ok(record)
    }

    fn delete(&self, id: RecordId) -> Result<()> {
        let _guard = self.write_guard(&id)?;
        let entry = self.index.get(id)?;

        self.log.tombstone_at(entry.log_offset)?;
        if let Err(e) = self.index.remove(id) {
            if let Err(undo) = self.log.reactivate_at(entry.log_offset) {
                tracing::error!(id = %id, offset = entry.log_offset, error = %undo, "Failed to undo tombstone");
                self.registry.remove(&id);
            }
            return Err(e);
        }
        self.registry.remove(&id);

        tracing::debug!(id = %id, offset = entry.log_offset, "Deleted record");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let _gate = self.gate.write();
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let flushed = self.log.sync().and_then(|()| self.index.persist());
        self.registry.clear();
        if let Err(e) = FileExt::unlock(&self.dir_lock) {
            tracing::warn!(error = %e, "Failed to release data directory lock");
        }
        flushed?;

        tracing::info!(data_dir = %self.config.data_dir.display(), "Collection closed");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    fn filter_projected<F>(&self, predicate: F) -> Result<Vec<R>>
    where
        F: Fn(&P::Fields) -> bool,
    {
        let _gate = self.read_gate()?;
        let mut entries = self.index.all();
        entries.sort_by_key(|e| e.id);

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for entry in entries {
            let fields: P::Fields = match decode_projection(&entry.projected) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(id = %entry.id, error = %e, "Skipping undecodable projection");
                    skipped += 1;
                    continue;
                }
            };
            if !predicate(&fields) {
                continue;
            }
            match self.cached_or_load(entry.id) {
                Ok(record) => records.push(record),
                Err(StoreError::NotFound(_)) => {}
                Err(e) if e.is_data_error() => {
                    tracing::warn!(id = %entry.id, error = %e, "Skipping unreadable record");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, returned = records.len(), "Projected filter skipped records");
        }
        Ok(records)
    }

    fn verify(&self) -> Result<VerifyReport> {
        let _gate = self.read_gate()?;
        let mut report = VerifyReport {
            indexed: self.index.len(),
            ..Default::default()
        };

        for slot in self.log.scan()? {
            let slot = match slot {
                Ok(s) => s,
                Err(e) if e.is_data_error() => {
                    tracing::warn!(error = %e, "Corrupt slot");
                    report.corrupt += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            if slot.status == SlotStatus::Deleted {
                report.deleted += 1;
                continue;
            }

            let id = match self.codec.decode(&slot.payload) {
                Ok(record) => self.codec.identifier_of(&record),
                Err(e) => {
                    tracing::warn!(offset = slot.offset, error = %e, "Undecodable slot");
                    report.undecodable += 1;
                    continue;
                }
            };
            match self.index.get(id) {
                Ok(entry) if entry.log_offset == slot.offset => report.active += 1,
                _ => {
                    tracing::warn!(id = %id, offset = slot.offset, "Active slot not referenced by index");
                    report.orphaned += 1;
                }
            }
        }

        Ok(report)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    fn compact(&self) -> Result<CompactionStats> {
        let _gate = self.gate.write();
        self.ensure_open()?;

        match compact_log(&self.log, &self.index) {
            Ok(stats) => {
                if stats.skipped > 0 {
                    let index = &self.index;
                    self.registry.retain(|id| index.contains(*id));
                }
                Ok(stats)
            }
            Err(e @ StoreError::Compaction(_)) => {
                tracing::error!(error = %e, "Compaction left index behind log, rebuilding");
                self.rebuild_locked()?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Shared gate for readers, checked against close
    fn read_gate(&self) -> Result<RwLockReadGuard<'_, ()>> {
        let gate = self.gate.read();
        self.ensure_open()?;
        Ok(gate)
    }

    fn write_guard(&self, id: &RecordId) -> Result<WriteGuard<'_>> {
        let guard = match &self.record_locks {
            None => WriteGuard::Exclusive {
                _gate: self.gate.write(),
            },
            Some(locks) => {
                let gate = self.gate.read();
                WriteGuard::Record {
                    _gate: gate,
                    _stripe: locks.lock(id),
                }
            }
        };
        self.ensure_open()?;
        Ok(guard)
    }

    /// Encoded projected fields, bounded by the index capacity
    fn project(&self, record: &R) -> Result<Vec<u8>> {
        let projected = encode_projection(&self.projector.project(record))?;
        if projected.len() > self.config.projection_capacity {
            return Err(StoreError::PayloadTooLarge {
                len: projected.len(),
                max: self.config.projection_capacity,
            });
        }
        Ok(projected)
    }

    /// Registry miss path: index -> log -> decode -> registry
    ///
    /// Caller holds the gate (shared or exclusive).
    fn load(&self, id: RecordId) -> Result<R> {
        let _stripe = self.record_locks.as_ref().map(|locks| locks.lock(&id));

        let entry = self.index.get(id)?;
        let payload = self.log.read_at(entry.log_offset)?;
        let record = self.codec.decode(&payload)?;
        self.registry.insert(id, record.clone());

        Ok(record)
    }

    fn cached_or_load(&self, id: RecordId) -> Result<R> {
        match self.registry.get(&id) {
            Some(record) => Ok(record),
            None => self.load(id),
        }
    }

    /// Materialize every live record passing `predicate`
    fn collect_where<F>(&self, predicate: F) -> Result<Vec<R>>
    where
        F: Fn(&R) -> bool,
    {
        let _gate = self.read_gate()?;
        let mut ids: Vec<RecordId> = self.index.all().into_iter().map(|e| e.id).collect();
        ids.sort();

        let mut records = Vec::with_capacity(ids.len());
        let mut skipped = 0usize;
        for id in ids {
            match self.cached_or_load(id) {
                Ok(record) => {
                    if predicate(&record) {
                        records.push(record);
                    }
                }
                // Deleted by a concurrent per-record writer
                Err(StoreError::NotFound(_)) => {}
                Err(e) if e.is_data_error() => {
                    tracing::warn!(id = %id, error = %e, "Skipping unreadable record");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, returned = records.len(), "Full scan skipped unreadable records");
        }
        Ok(records)
    }

    /// Rebuild with the gate already held exclusively (or during open)
    fn rebuild_locked(&self) -> Result<RebuildStats> {
        let codec = &self.codec;
        let stats = self.index.rebuild_from_log(&self.log, |payload| {
            let record = codec.decode(payload)?;
            let id = codec.identifier_of(&record);
            if id.is_nil() {
                return Err(StoreError::Decoding("record has no id".to_string()));
            }
            Ok((id, self.project(&record)?))
        })?;
        self.registry.clear();
        Ok(stats)
    }

    /// Sanity checks on a freshly loaded index: offsets inside the log and
    /// projections decodable as `P::Fields`
    fn check_loaded_index(&self) -> std::result::Result<(), String> {
        let log_len = self.log.len_bytes();
        let slot_size = self.config.slot_size as u64;

        for entry in self.index.all() {
            if entry.log_offset % slot_size != 0 || entry.log_offset + slot_size > log_len {
                return Err(format!(
                    "entry {} points at offset {} outside the log ({} bytes)",
                    entry.id, entry.log_offset, log_len
                ));
            }
            if let Err(e) = decode_projection::<P::Fields>(&entry.projected) {
                return Err(format!("entry {}: {}", entry.id, e));
            }
        }
        Ok(())
    }
}

/// Take `{data_dir}/{file_name}` exclusively for the life of the collection
fn acquire_lock(data_dir: &Path, file_name: &str) -> Result<File> {
    let lock_path = data_dir.join(file_name);
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(&lock_path)?;

    match FileExt::try_lock_exclusive(&lock_file) {
        Ok(()) => Ok(lock_file),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(StoreError::Locked(data_dir.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

impl<R> Collection<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    /// Open a JSON collection without projections, default config
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config, JsonCodec::new(), NoProjection)
    }
}

impl<R, C, P> CompactionTarget for Core<R, C, P>
where
    R: Record,
    C: Codec<R>,
    P: Projector<R>,
{
    fn name(&self) -> String {
        self.config.data_dir.display().to_string()
    }

    fn compact(&self) -> Result<CompactionStats> {
        Core::compact(self)
    }
}

impl<R, C, P> Drop for Collection<R, C, P>
where
    R: Record,
    C: Codec<R>,
    P: Projector<R>,
{
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!(error = %e, "Failed to close collection on drop");
        }
    }
}
