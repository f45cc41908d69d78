//! Index file
//!
//! Fixed-width index records behind a small header.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};

use crate::codec::RecordId;
use crate::config::SyncStrategy;
use crate::error::{Result, StoreError};
use crate::log::sync_parent_dir;

/// Magic bytes identifying a slotstore index file
pub const MAGIC: &[u8; 4] = b"SLIX";

/// Current index format version
pub const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Capacity (2) + Clean (1) + Reserved (7)
pub const HEADER_SIZE: u64 = 16;

/// Log offset stored in a tombstoned index record
pub const TOMBSTONE_OFFSET: u64 = u64::MAX;

/// Byte position of the clean flag inside the header
const CLEAN_FLAG_POS: u64 = 8;

/// Id (16) + Offset (8) + Len (2)
const RECORD_PREFIX: usize = 26;

/// Trailing CRC32
const CRC_SIZE: usize = 4;

/// One record of the index file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub id: RecordId,
    pub log_offset: u64,
    pub projected: Vec<u8>,
}

impl IndexRecord {
    pub fn is_tombstone(&self) -> bool {
        self.log_offset == TOMBSTONE_OFFSET
    }
}

/// Size of one record for a given projection capacity
pub(crate) fn record_size(capacity: usize) -> usize {
    RECORD_PREFIX + capacity + CRC_SIZE
}

/// Encode a record, padding the projection area to `capacity`
pub(crate) fn encode_record(record: &IndexRecord, capacity: usize) -> Result<BytesMut> {
    if record.projected.len() > capacity {
        return Err(StoreError::PayloadTooLarge {
            len: record.projected.len(),
            max: capacity,
        });
    }

    let mut buf = BytesMut::with_capacity(record_size(capacity));
    buf.put_slice(record.id.as_bytes());
    buf.put_u64_le(record.log_offset);
    buf.put_u16_le(record.projected.len() as u16);
    buf.put_slice(&record.projected);
    buf.put_bytes(0, capacity - record.projected.len());

    let crc = crc32fast::hash(&buf);
    buf.put_u32_le(crc);

    Ok(buf)
}

/// Decode a record; any mismatch is index corruption
pub(crate) fn decode_record(mut buf: &[u8], capacity: usize) -> Result<IndexRecord> {
    if buf.len() != record_size(capacity) {
        return Err(StoreError::IndexCorruption(format!(
            "record is {} bytes, expected {}",
            buf.len(),
            record_size(capacity)
        )));
    }

    let body_len = buf.len() - CRC_SIZE;
    let expected_crc = crc32fast::hash(&buf[..body_len]);
    let stored_crc = u32::from_le_bytes([
        buf[body_len],
        buf[body_len + 1],
        buf[body_len + 2],
        buf[body_len + 3],
    ]);
    if expected_crc != stored_crc {
        return Err(StoreError::IndexCorruption(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored_crc, expected_crc
        )));
    }

    let mut id = [0u8; 16];
    buf.copy_to_slice(&mut id);
    let log_offset = buf.get_u64_le();
    let len = buf.get_u16_le() as usize;
    if len > capacity {
        return Err(StoreError::IndexCorruption(format!(
            "projected length {} exceeds capacity {}",
            len, capacity
        )));
    }

    Ok(IndexRecord {
        id: RecordId::from_bytes(id),
        log_offset,
        projected: buf[..len].to_vec(),
    })
}

fn encode_header(capacity: usize, clean: bool) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE as usize);
    buf.put_slice(MAGIC);
    buf.put_u16_le(VERSION);
    buf.put_u16_le(capacity as u16);
    buf.put_u8(clean as u8);
    buf.put_bytes(0, 7);
    buf
}

/// Result of reading an index file from disk
pub(crate) enum FileLoad {
    /// File parsed: live records with their record positions
    Loaded(IndexFile, Vec<(u64, IndexRecord)>),

    /// No index file on disk
    Missing,

    /// File exists but can't be trusted
    Invalid(String),
}

/// Open index file handle
pub(crate) struct IndexFile {
    path: PathBuf,
    file: File,
    capacity: usize,

    /// End of file (next append position)
    len: u64,

    sync_strategy: SyncStrategy,
    unsynced: usize,
}

impl IndexFile {
    /// Read and validate an existing index file
    ///
    /// On success the clean flag is cleared: the file is now "in use" and
    /// a crash before the next `set_clean(true)` forces a rebuild.
    pub(crate) fn load(path: &Path, capacity: usize, sync_strategy: SyncStrategy) -> Result<FileLoad> {
        let mut file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(FileLoad::Missing),
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(FileLoad::Invalid("index file is empty".to_string()));
        }
        if len < HEADER_SIZE {
            return Ok(FileLoad::Invalid("index header is truncated".to_string()));
        }

        let mut data = Vec::with_capacity(len as usize);
        file.read_to_end(&mut data)?;

        let mut header = &data[..HEADER_SIZE as usize];
        if &header[0..4] != MAGIC {
            return Ok(FileLoad::Invalid(format!(
                "invalid index magic: {:?}",
                &header[0..4]
            )));
        }
        header.advance(4);
        let version = header.get_u16_le();
        if version != VERSION {
            return Ok(FileLoad::Invalid(format!(
                "unsupported index version {}",
                version
            )));
        }
        let stored_capacity = header.get_u16_le() as usize;
        if stored_capacity != capacity {
            return Ok(FileLoad::Invalid(format!(
                "index projection capacity {} differs from configured {}",
                stored_capacity, capacity
            )));
        }
        if header.get_u8() != 1 {
            return Ok(FileLoad::Invalid(
                "index was not cleanly closed".to_string(),
            ));
        }

        let size = record_size(capacity);
        let body = &data[HEADER_SIZE as usize..];
        if body.len() % size != 0 {
            return Ok(FileLoad::Invalid(format!(
                "index body of {} bytes is not a multiple of record size {}",
                body.len(),
                size
            )));
        }

        let mut records = Vec::with_capacity(body.len() / size);
        let mut seen = std::collections::HashSet::new();
        for (i, chunk) in body.chunks_exact(size).enumerate() {
            let record = match decode_record(chunk, capacity) {
                Ok(r) => r,
                Err(e) => return Ok(FileLoad::Invalid(format!("record {}: {}", i, e))),
            };
            if record.is_tombstone() {
                continue;
            }
            if !seen.insert(record.id) {
                return Ok(FileLoad::Invalid(format!(
                    "record {}: duplicate live id {}",
                    i, record.id
                )));
            }
            let pos = HEADER_SIZE + (i * size) as u64;
            records.push((pos, record));
        }

        let mut index_file = Self {
            path: path.to_path_buf(),
            file,
            capacity,
            len,
            sync_strategy,
            unsynced: 0,
        };
        index_file.set_clean(false)?;

        Ok(FileLoad::Loaded(index_file, records))
    }

    /// Write a complete index file via a temporary + rename
    ///
    /// Returns the open file and the position of every record, in order.
    pub(crate) fn rewrite(
        path: &Path,
        capacity: usize,
        sync_strategy: SyncStrategy,
        records: &[IndexRecord],
    ) -> Result<(Self, Vec<u64>)> {
        let tmp_path = path.with_extension("idx.compact");
        let size = record_size(capacity) as u64;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE as usize + records.len() * size as usize);
        buf.extend_from_slice(&encode_header(capacity, false));
        let mut positions = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            buf.extend_from_slice(&encode_record(record, capacity)?);
            positions.push(HEADER_SIZE + i as u64 * size);
        }

        {
            let mut tmp = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            tmp.write_all(&buf)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        sync_parent_dir(path)?;

        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();

        Ok((
            Self {
                path: path.to_path_buf(),
                file,
                capacity,
                len,
                sync_strategy,
                unsynced: 0,
            },
            positions,
        ))
    }

    /// Append a record, returning its position
    pub(crate) fn append(&mut self, record: &IndexRecord) -> Result<u64> {
        let buf = encode_record(record, self.capacity)?;
        let pos = self.len;

        self.file.seek(SeekFrom::Start(pos))?;
        if let Err(e) = self.file.write_all(&buf) {
            if let Err(trunc) = self.file.set_len(pos) {
                tracing::warn!(pos, error = %trunc, "Failed to roll back torn index append");
            }
            return Err(e.into());
        }
        self.len += buf.len() as u64;
        self.after_write()?;

        Ok(pos)
    }

    /// Overwrite the record at `pos` in place
    pub(crate) fn overwrite(&mut self, pos: u64, record: &IndexRecord) -> Result<()> {
        let buf = encode_record(record, self.capacity)?;
        if pos < HEADER_SIZE || pos + buf.len() as u64 > self.len {
            return Err(StoreError::IndexCorruption(format!(
                "record position {} out of bounds",
                pos
            )));
        }

        self.file.seek(SeekFrom::Start(pos))?;
        self.file.write_all(&buf)?;
        self.after_write()
    }

    /// Tombstone the record at `pos`
    pub(crate) fn tombstone(&mut self, pos: u64, id: RecordId) -> Result<()> {
        self.overwrite(
            pos,
            &IndexRecord {
                id,
                log_offset: TOMBSTONE_OFFSET,
                projected: Vec::new(),
            },
        )
    }

    /// Flip the header's clean flag and sync
    ///
    /// Pending records are synced first, so a clean flag on disk never
    /// covers records that did not make it.
    pub(crate) fn set_clean(&mut self, clean: bool) -> Result<()> {
        self.sync()?;
        self.file.seek(SeekFrom::Start(CLEAN_FLAG_POS))?;
        self.file.write_all(&[clean as u8])?;
        self.sync()
    }

    pub(crate) fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn after_write(&mut self) -> Result<()> {
        self.unsynced += 1;
        match self.sync_strategy {
            SyncStrategy::EveryWrite => self.sync(),
            SyncStrategy::EveryNEntries { count } if self.unsynced >= count => self.sync(),
            SyncStrategy::EveryNEntries { .. } => Ok(()),
        }
    }
}
