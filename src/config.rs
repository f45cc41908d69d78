//! Configuration for slotstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Largest slot size accepted by `Config::validate`
pub const MAX_SLOT_SIZE: usize = 16 * 1024 * 1024;

/// Configuration for one collection
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding this collection's files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── LOCK              (held while the collection is open)
    ///     ├── records.log       (fixed-size slots)
    ///     ├── records.log.meta  (slot size the log was written with)
    ///     └── records.idx       (fixed-width index records)
    pub data_dir: PathBuf,

    /// Size of every slot in the record log: 1 status byte + payload area
    pub slot_size: usize,

    /// Bytes reserved for encoded projected fields in each index record
    pub projection_capacity: usize,

    /// How often log and index writes are fsynced
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Concurrency Configuration
    // -------------------------------------------------------------------------
    /// Writer locking discipline
    pub lock_strategy: LockStrategy,

    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// Interval for background compaction (None = disabled)
    pub compaction_interval: Option<Duration>,
}

/// Sync strategy: how often to fsync the log and index files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced writes (balanced durability/performance)
    EveryNEntries { count: usize },
}

/// Locking discipline for writers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrategy {
    /// One reader/writer gate: writers are fully serialized
    Coarse,

    /// Writers share the gate and serialize per record id over `stripes`
    /// striped mutexes, so writes to different records run in parallel
    PerRecord { stripes: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./slotstore_data"),
            slot_size: 2048,
            projection_capacity: 256,
            sync_strategy: SyncStrategy::EveryWrite,
            lock_strategy: LockStrategy::Coarse,
            compaction_interval: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.slot_size < 2 {
            return Err(StoreError::Config(format!(
                "slot_size must be at least 2, got {}",
                self.slot_size
            )));
        }
        if self.slot_size > MAX_SLOT_SIZE {
            return Err(StoreError::Config(format!(
                "slot_size must be at most {}, got {}",
                MAX_SLOT_SIZE, self.slot_size
            )));
        }
        if self.projection_capacity > u16::MAX as usize {
            return Err(StoreError::Config(format!(
                "projection_capacity must fit in u16, got {}",
                self.projection_capacity
            )));
        }
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(StoreError::Config(
                "sync_strategy count must be non-zero".to_string(),
            ));
        }
        if let LockStrategy::PerRecord { stripes: 0 } = self.lock_strategy {
            return Err(StoreError::Config(
                "lock_strategy stripes must be non-zero".to_string(),
            ));
        }
        if self.compaction_interval == Some(Duration::ZERO) {
            return Err(StoreError::Config(
                "compaction_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Largest payload a slot can hold
    pub fn max_payload(&self) -> usize {
        self.slot_size - 1
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the slot size (in bytes)
    pub fn slot_size(mut self, size: usize) -> Self {
        self.config.slot_size = size;
        self
    }

    /// Set the projected-fields capacity per index record (in bytes)
    pub fn projection_capacity(mut self, size: usize) -> Self {
        self.config.projection_capacity = size;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the lock strategy
    pub fn lock_strategy(mut self, strategy: LockStrategy) -> Self {
        self.config.lock_strategy = strategy;
        self
    }

    /// Enable background compaction at the given interval
    pub fn compaction_interval(mut self, interval: Duration) -> Self {
        self.config.compaction_interval = Some(interval);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
