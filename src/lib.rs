//! # slotstore
//!
//! An embeddable persistent collection store with:
//! - Fixed-size slot log for durable, O(1)-addressable records
//! - Offset index with per-record projected fields
//! - Read-through in-memory registry
//! - Crash recovery by rebuilding the index from the log
//! - Background compaction that reclaims tombstoned slots
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Domain layer (any Record type)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  create / read / read_all / update / delete
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Collection                              │
//! │       (RwLock gate, optional per-record lock stripes)        │
//! └──────┬──────────────┬──────────────┬───────────────┬────────┘
//!        │              │              │               │
//!        ▼              ▼              ▼               ▼
//!  ┌──────────┐  ┌────────────┐  ┌────────────┐  ┌────────────┐
//!  │  Codec   │  │  SlotLog   │  │OffsetIndex │  │  Registry  │
//!  │ + Project│  │ (slots)    │  │ (id→offset)│  │  (cache)   │
//!  └──────────┘  └─────┬──────┘  └─────┬──────┘  └────────────┘
//!                      │               │
//!                      └──────┬────────┘
//!                             ▼
//!                     ┌──────────────┐
//!                     │  Compaction  │
//!                     │ (background) │
//!                     └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod log;
pub mod index;
pub mod registry;
pub mod compaction;
pub mod collection;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::{Config, LockStrategy, SyncStrategy};
pub use codec::{Codec, Document, JsonCodec, NoProjection, Projector, Record, RecordId};
pub use collection::{Collection, CollectionStats, VerifyReport};
pub use compaction::CompactionStats;
pub use index::RebuildStats;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of slotstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
