//! Registry Module
//!
//! In-memory read-through cache of materialized records.
//!
//! ## Responsibilities
//! - Serve reads without touching the log
//! - Be populated lazily on read misses and directly on writes
//! - Drop entries only on explicit delete (no TTL)
//!
//! ## Data Structure Choice
//! HashMap wrapped in a parking_lot RwLock: lookups are by id only, and
//! many readers can hit the cache at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::codec::RecordId;

/// Read-through cache of records by id
///
/// Invariant: an entry, when present, equals what a fresh read of the
/// log at the indexed offset would decode to.
pub struct Registry<R> {
    records: RwLock<HashMap<RecordId, R>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<R: Clone> Registry<R> {
    /// Create a new empty Registry
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a record by id (read lock), counting hits and misses
    pub fn get(&self, id: &RecordId) -> Option<R> {
        let found = self.records.read().get(id).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Insert or replace a record (write lock)
    pub fn insert(&self, id: RecordId, record: R) {
        self.records.write().insert(id, record);
    }

    /// Evict a record (write lock)
    pub fn remove(&self, id: &RecordId) -> Option<R> {
        self.records.write().remove(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.read().contains_key(id)
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Keep only records whose id passes `keep`
    pub fn retain<F: FnMut(&RecordId) -> bool>(&self, mut keep: F) {
        self.records.write().retain(|id, _| keep(id));
    }

    /// Drop every cached record
    pub fn clear(&self) {
        self.records.write().clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl<R: Clone> Default for Registry<R> {
    fn default() -> Self {
        Self::new()
    }
}
