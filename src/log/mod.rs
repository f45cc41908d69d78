//! Slotted Log Module
//!
//! Append-only record log made of fixed-size slots.
//!
//! ## Responsibilities
//! - Append a payload as one whole slot at end-of-file
//! - O(1) random access by byte offset
//! - In-place overwrite of a slot (slot size never changes)
//! - Single-byte tombstones (space is reclaimed by compaction)
//! - Restartable full-file scans for index rebuild
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Slot 0  (SLOT_SIZE bytes)                    │
//! │ ┌──────────┬────────────────┬──────────────┐ │
//! │ │Status (1)│ Payload        │ Zero padding │ │
//! │ └──────────┴────────────────┴──────────────┘ │
//! ├──────────────────────────────────────────────┤
//! │ Slot 1  (SLOT_SIZE bytes)                    │
//! │ ...                                          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Status is ACTIVE (0x01) or DELETED (0x02). The payload ends at the
//! first zero byte, or fills the whole payload area.
//!
//! The slot size is recorded in a small sidecar (`<log>.meta`) so a log
//! is never read with the wrong stride.

mod file;
mod meta;
mod scanner;
mod slot;

pub use file::SlotLog;
pub use meta::{meta_path, META_MAGIC, META_SIZE, META_VERSION};
pub use scanner::{ScannedSlot, SlotScanner};
pub(crate) use file::sync_parent_dir;
pub use slot::{decode_slot, encode_slot, validate_payload, SlotStatus, STATUS_ACTIVE, STATUS_DELETED};
