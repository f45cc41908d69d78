//! Slot Scanner
//!
//! Sequential walk over every slot in a log file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, StoreError};

use super::slot::{decode_slot, SlotStatus};

/// One slot produced by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedSlot {
    pub offset: u64,
    pub status: SlotStatus,
    pub payload: Vec<u8>,
}

/// Iterator over the slots of a log, offset 0 to end-of-file
///
/// Uses its own read-only handle. A short read at the end is treated as
/// the end of the log; a slot that fails to parse yields an error and the
/// walk moves on to the next slot.
pub struct SlotScanner {
    reader: BufReader<File>,
    slot_size: usize,
    offset: u64,
    end: u64,
    buf: Vec<u8>,
}

impl SlotScanner {
    pub(super) fn open(path: &Path, slot_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let end = len - len % slot_size as u64;

        Ok(Self {
            reader: BufReader::new(file),
            slot_size,
            offset: 0,
            end,
            buf: vec![0u8; slot_size],
        })
    }
}

impl Iterator for SlotScanner {
    type Item = Result<ScannedSlot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.end {
            return None;
        }

        let offset = self.offset;
        if let Err(e) = self.reader.read_exact(&mut self.buf) {
            // File shrank under us (compaction swap): nothing more to read
            self.end = offset;
            if e.kind() == ErrorKind::UnexpectedEof {
                return None;
            }
            return Some(Err(StoreError::Io(e)));
        }
        self.offset += self.slot_size as u64;

        Some(
            decode_slot(&self.buf, offset).map(|(status, payload)| ScannedSlot {
                offset,
                status,
                payload: payload.to_vec(),
            }),
        )
    }
}
