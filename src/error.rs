//! Error types for slotstore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::RecordId;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for slotstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Record already exists: {0}")]
    AlreadyExists(RecordId),

    // -------------------------------------------------------------------------
    // Record Shape Errors
    // -------------------------------------------------------------------------
    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt slot at offset {offset}: {reason}")]
    CorruptSlot { offset: u64, reason: String },

    #[error("Slot at offset {offset} is deleted")]
    DeletedRecord { offset: u64 },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Collection is closed")]
    Closed,

    #[error("Data directory is locked by another collection: {0}")]
    Locked(PathBuf),

    #[error("Compaction error: {0}")]
    Compaction(String),
}

impl StoreError {
    /// True when the error means "no such record"
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// True for per-record data anomalies that bulk scans log and skip
    /// instead of aborting.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            StoreError::Decoding(_)
                | StoreError::CorruptSlot { .. }
                | StoreError::DeletedRecord { .. }
        )
    }
}
