//! Log metadata sidecar
//!
//! `<log>.meta` pins the slot size a log was written with. It is created
//! before the first slot and checked on every open, before the log file
//! is read or truncated.
//!
//! ```text
//! ┌───────────┬─────────────┬──────────────┬────────────────┬──────────┐
//! │ "SLMT" (4)│ Version u16 │ Reserved u16 │ Slot size u32  │ CRC u32  │
//! └───────────┴─────────────┴──────────────┴────────────────┴──────────┘
//! ```

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, StoreError};

use super::file::sync_parent_dir;

/// Magic bytes identifying a log metadata file
pub const META_MAGIC: &[u8; 4] = b"SLMT";

/// Current metadata format version
pub const META_VERSION: u16 = 1;

/// Magic (4) + Version (2) + Reserved (2) + Slot size (4) + CRC (4)
pub const META_SIZE: usize = 16;

/// Path of the metadata file belonging to `log_path`
pub fn meta_path(log_path: &Path) -> PathBuf {
    log_path.with_extension("log.meta")
}

/// Make sure the log at `log_path` uses `slot_size`
///
/// A brand-new (missing or empty) log gets its metadata written. An
/// existing log must have metadata recording the same slot size, or
/// the open fails with `StoreError::Config` and the log is left alone.
pub(crate) fn check_or_init(log_path: &Path, slot_size: usize) -> Result<()> {
    let path = meta_path(log_path);

    match fs::read(&path) {
        Ok(data) => {
            let stored = decode_meta(&data).map_err(|reason| {
                StoreError::Config(format!("log metadata {} is unreadable: {}", path.display(), reason))
            })?;
            if stored != slot_size {
                return Err(StoreError::Config(format!(
                    "log {} was written with slot size {}, configured {}",
                    log_path.display(),
                    stored,
                    slot_size
                )));
            }
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let log_len = match fs::metadata(log_path) {
                Ok(m) => m.len(),
                Err(e) if e.kind() == ErrorKind::NotFound => 0,
                Err(e) => return Err(e.into()),
            };
            if log_len > 0 {
                return Err(StoreError::Config(format!(
                    "log {} holds {} bytes but {} is missing; its slot size is unknown",
                    log_path.display(),
                    log_len,
                    path.display()
                )));
            }
            write_meta(&path, slot_size)
        }
        Err(e) => Err(e.into()),
    }
}

fn encode_meta(slot_size: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(META_SIZE);
    buf.put_slice(META_MAGIC);
    buf.put_u16_le(META_VERSION);
    buf.put_u16_le(0);
    buf.put_u32_le(slot_size as u32);
    let crc = crc32fast::hash(&buf);
    buf.put_u32_le(crc);
    buf
}

fn decode_meta(data: &[u8]) -> std::result::Result<usize, String> {
    if data.len() != META_SIZE {
        return Err(format!("{} bytes, expected {}", data.len(), META_SIZE));
    }
    if &data[0..4] != META_MAGIC {
        return Err(format!("invalid magic {:?}", &data[0..4]));
    }

    let body = &data[..META_SIZE - 4];
    let mut crc_bytes = &data[META_SIZE - 4..];
    let stored_crc = crc_bytes.get_u32_le();
    let computed = crc32fast::hash(body);
    if stored_crc != computed {
        return Err(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored_crc, computed
        ));
    }

    let mut fields = &body[4..];
    let version = fields.get_u16_le();
    if version != META_VERSION {
        return Err(format!("unsupported version {}", version));
    }
    fields.advance(2);
    Ok(fields.get_u32_le() as usize)
}

/// Write via a temporary + rename so a crash never leaves half a file
fn write_meta(path: &Path, slot_size: usize) -> Result<()> {
    let tmp_path = path.with_extension("meta.tmp");
    {
        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.write_all(&encode_meta(slot_size))?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    sync_parent_dir(path)
}
