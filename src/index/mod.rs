//! Offset Index Module
//!
//! Persistent mapping from record id to log offset, plus the record's
//! encoded projected fields.
//!
//! ## Responsibilities
//! - Load the persisted index on open, or report why it can't be trusted
//! - Rebuild from the slot log (crash recovery)
//! - Append / in-place update / tombstone of index records
//! - Snapshots for full scans and compaction
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                               │
//! │   Magic "SLIX" (4) | Version u16 | Capacity u16 | Clean u8 | 0s │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Record (26 + capacity + 4 bytes, fixed width)                   │
//! │ ┌────────┬────────────┬──────────┬─────────────────┬──────────┐ │
//! │ │ Id (16)│ Offset (8) │ Len (2)  │ Projected + pad │ CRC (4)  │ │
//! │ └────────┴────────────┴──────────┴─────────────────┴──────────┘ │
//! │ ... repeated ...                                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//! Integers are little-endian. Offset = u64::MAX marks a tombstone.
//! Clean = 1 only after an orderly close; an index left dirty by a crash
//! is rebuilt from the log.

mod file;
mod table;

pub use file::{IndexRecord, HEADER_SIZE, MAGIC, TOMBSTONE_OFFSET, VERSION};
pub use table::{IndexEntry, LoadOutcome, OffsetIndex, RebuildStats};
