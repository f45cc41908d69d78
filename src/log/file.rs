//! Slot Log file
//!
//! Owns the single read/write handle on the record log.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::SyncStrategy;
use crate::error::{Result, StoreError};

use super::meta;
use super::scanner::SlotScanner;
use super::slot::{decode_slot, encode_slot, SlotStatus, STATUS_ACTIVE, STATUS_DELETED};

/// Append-only log of fixed-size slots
///
/// ## Concurrency:
/// - The file handle lives behind a Mutex so every method takes `&self`
///   (a seek + read/write pair must not interleave with another one)
/// - Scans open their own read-only handle and never touch the Mutex
pub struct SlotLog {
    /// Path of the log file
    path: PathBuf,

    /// Fixed slot size in bytes
    slot_size: usize,

    /// Open handle + bookkeeping
    inner: Mutex<LogFile>,
}

struct LogFile {
    file: File,

    /// Current file length (append cursor), always a multiple of slot_size
    len: u64,

    sync_strategy: SyncStrategy,

    /// Writes since the last fsync
    unsynced: usize,
}

impl LogFile {
    fn after_write(&mut self) -> Result<()> {
        self.unsynced += 1;
        match self.sync_strategy {
            SyncStrategy::EveryWrite => self.sync(),
            SyncStrategy::EveryNEntries { count } => {
                if self.unsynced >= count {
                    self.sync()
                } else {
                    Ok(())
                }
            }
        }
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }
}

impl SlotLog {
    /// Open or create a slot log
    ///
    /// The slot size is checked against the log's metadata first; a log
    /// written with another slot size is refused untouched. A trailing
    /// partial slot (torn append) is then truncated away so the next
    /// append lands on a slot boundary.
    pub fn open(path: &Path, slot_size: usize, sync_strategy: SyncStrategy) -> Result<Self> {
        meta::check_or_init(path, slot_size)?;
        let file = Self::open_file(path)?;
        let len = Self::align_length(&file, path, slot_size)?;

        tracing::debug!(path = %path.display(), slots = len / slot_size as u64, "Opened slot log");

        Ok(Self {
            path: path.to_path_buf(),
            slot_size,
            inner: Mutex::new(LogFile {
                file,
                len,
                sync_strategy,
                unsynced: 0,
            }),
        })
    }

    /// Append a payload as a new ACTIVE slot, returning its offset
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        let slot = encode_slot(payload, self.slot_size)?;
        let mut inner = self.inner.lock();

        let offset = inner.len;
        inner.file.seek(SeekFrom::Start(offset))?;
        if let Err(e) = inner.file.write_all(&slot) {
            // Drop whatever part of the slot made it to the file
            if let Err(trunc) = inner.file.set_len(offset) {
                tracing::warn!(offset, error = %trunc, "Failed to roll back torn append");
            }
            return Err(e.into());
        }
        inner.len = offset + self.slot_size as u64;
        inner.after_write()?;

        Ok(offset)
    }

    /// Read the payload of the ACTIVE slot at `offset`
    pub fn read_at(&self, offset: u64) -> Result<Vec<u8>> {
        let slot = self.read_slot(offset)?.ok_or_else(|| StoreError::CorruptSlot {
            offset,
            reason: "offset past end of log".to_string(),
        })?;

        match decode_slot(&slot, offset)? {
            (SlotStatus::Deleted, _) => Err(StoreError::DeletedRecord { offset }),
            (SlotStatus::Active, payload) => Ok(payload.to_vec()),
        }
    }

    /// Read the raw slot bytes at `offset`
    ///
    /// Returns `Ok(None)` when the slot lies (partly) past end-of-file.
    pub fn read_slot(&self, offset: u64) -> Result<Option<Vec<u8>>> {
        self.check_aligned(offset)?;
        let mut inner = self.inner.lock();

        if offset + self.slot_size as u64 > inner.len {
            return Ok(None);
        }

        let mut slot = vec![0u8; self.slot_size];
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.read_exact(&mut slot)?;

        Ok(Some(slot))
    }

    /// Overwrite the slot at `offset` with a new ACTIVE payload
    pub fn update_at(&self, offset: u64, payload: &[u8]) -> Result<()> {
        let slot = encode_slot(payload, self.slot_size)?;
        self.check_aligned(offset)?;
        let mut inner = self.inner.lock();
        Self::check_in_bounds(&inner, offset, self.slot_size)?;

        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(&slot)?;
        inner.after_write()
    }

    /// Mark the slot at `offset` DELETED (single byte write)
    pub fn tombstone_at(&self, offset: u64) -> Result<()> {
        self.write_status(offset, STATUS_DELETED)
    }

    /// Undo a tombstone: mark the slot at `offset` ACTIVE again
    pub fn reactivate_at(&self, offset: u64) -> Result<()> {
        self.write_status(offset, STATUS_ACTIVE)
    }

    /// Put back raw slot bytes previously returned by `read_slot`
    pub fn restore_slot(&self, offset: u64, slot: &[u8]) -> Result<()> {
        if slot.len() != self.slot_size {
            return Err(StoreError::CorruptSlot {
                offset,
                reason: format!("raw slot is {} bytes, expected {}", slot.len(), self.slot_size),
            });
        }
        self.check_aligned(offset)?;
        let mut inner = self.inner.lock();
        Self::check_in_bounds(&inner, offset, self.slot_size)?;

        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(slot)?;
        inner.after_write()
    }

    /// Walk every slot from offset 0; each call starts a fresh walk
    pub fn scan(&self) -> Result<SlotScanner> {
        SlotScanner::open(&self.path, self.slot_size)
    }

    /// Force sync to disk
    pub fn sync(&self) -> Result<()> {
        self.inner.lock().sync()
    }

    /// Swap in a fully written replacement log (compaction)
    ///
    /// The replacement is opened before it is renamed over the current
    /// file, so once the rename succeeds the handle already points at the
    /// new log. A failure after the rename is returned as
    /// `StoreError::Compaction`: the log has moved and every offset held
    /// elsewhere is stale.
    pub fn replace_with(&self, replacement: &Path) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.sync()?;

        let file = OpenOptions::new().read(true).write(true).open(replacement)?;
        let len = file.metadata()?.len();
        if len % self.slot_size as u64 != 0 {
            return Err(StoreError::CorruptSlot {
                offset: len - len % self.slot_size as u64,
                reason: format!("replacement log of {} bytes ends in a partial slot", len),
            });
        }

        fs::rename(replacement, &self.path)?;
        inner.file = file;
        inner.len = len;
        inner.unsynced = 0;

        sync_parent_dir(&self.path).map_err(|e| {
            StoreError::Compaction(format!("log swapped but directory sync failed: {}", e))
        })
    }

    /// Current length of the log in bytes
    pub fn len_bytes(&self) -> u64 {
        self.inner.lock().len
    }

    /// Number of slots (active + deleted)
    pub fn slot_count(&self) -> u64 {
        self.len_bytes() / self.slot_size as u64
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes not yet fsynced (for testing)
    pub fn unsynced_count(&self) -> usize {
        self.inner.lock().unsynced
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn open_file(path: &Path) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?)
    }

    /// Truncate a trailing partial slot and return the aligned length
    fn align_length(file: &File, path: &Path, slot_size: usize) -> Result<u64> {
        let len = file.metadata()?.len();
        let aligned = len - len % slot_size as u64;

        if aligned != len {
            tracing::warn!(
                path = %path.display(),
                len,
                aligned,
                "Truncating partial slot at end of log"
            );
            file.set_len(aligned)?;
            file.sync_all()?;
        }

        Ok(aligned)
    }

    fn write_status(&self, offset: u64, status: u8) -> Result<()> {
        self.check_aligned(offset)?;
        let mut inner = self.inner.lock();
        Self::check_in_bounds(&inner, offset, self.slot_size)?;

        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(&[status])?;
        inner.after_write()
    }

    fn check_aligned(&self, offset: u64) -> Result<()> {
        if offset % self.slot_size as u64 != 0 {
            return Err(StoreError::CorruptSlot {
                offset,
                reason: format!("offset is not aligned to slot size {}", self.slot_size),
            });
        }
        Ok(())
    }

    fn check_in_bounds(inner: &LogFile, offset: u64, slot_size: usize) -> Result<()> {
        if offset + slot_size as u64 > inner.len {
            return Err(StoreError::CorruptSlot {
                offset,
                reason: "offset past end of log".to_string(),
            });
        }
        Ok(())
    }
}

/// fsync the directory holding `path` so a rename is durable
pub(crate) fn sync_parent_dir(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        if let Some(dir) = path.parent() {
            let dir = if dir.as_os_str().is_empty() {
                Path::new(".")
            } else {
                dir
            };
            File::open(dir)?.sync_all()?;
        }
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
