//! Codec Module
//!
//! Turns domain records into slot payloads and back.
//!
//! ## Responsibilities
//! - Time-ordered record identifiers (`RecordId`)
//! - The `Record` contract: every stored type exposes get/set of its id
//! - The `Codec` contract: record <-> payload bytes
//! - The `Projector` contract: record -> small "projected fields" value
//!   kept in the offset index for filtering without a full decode
//!
//! ## Payload Rule
//! Slot payload length is recovered by scanning for the first zero byte,
//! so payload encodings must never emit NUL. `JsonCodec` satisfies this
//! (JSON escapes control characters inside strings).

mod json;
mod projection;

pub use json::{Document, JsonCodec};
pub use projection::{decode_projection, encode_projection, NoProjection, Projector};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};

// =============================================================================
// Record Identifier
// =============================================================================

/// 128-bit time-ordered record identifier (UUID v7)
///
/// The nil value means "unset": `Collection::create` mints a fresh id for
/// records that carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Size of an identifier on disk
    pub const SIZE: usize = 16;

    /// Mint a fresh identifier, monotonically increasing with time
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The unset identifier
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| StoreError::Decoding(format!("invalid record id {:?}: {}", s, e)))
    }
}

// =============================================================================
// Record / Codec Contracts
// =============================================================================

/// A domain value with exactly one identifier field
pub trait Record: Clone + Send + Sync + 'static {
    /// Current identifier (nil if unset)
    fn id(&self) -> RecordId;

    /// Assign the identifier
    fn set_id(&mut self, id: RecordId);
}

/// Serializes records to slot payloads and back
///
/// `encode` must never produce NUL bytes (see module docs).
pub trait Codec<R: Record>: Send + Sync + 'static {
    /// Record -> payload bytes
    fn encode(&self, record: &R) -> Result<Vec<u8>>;

    /// Payload bytes -> record
    fn decode(&self, bytes: &[u8]) -> Result<R>;

    fn identifier_of(&self, record: &R) -> RecordId {
        record.id()
    }

    fn set_identifier(&self, record: &mut R, id: RecordId) {
        record.set_id(id)
    }
}
