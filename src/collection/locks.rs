//! Striped per-record locks
//!
//! A fixed array of mutexes; a record id always maps to the same stripe,
//! so two writers of the same record serialize while writers of records
//! on different stripes run in parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::{Mutex, MutexGuard, RwLockReadGuard, RwLockWriteGuard};

use crate::codec::RecordId;

pub(crate) struct LockTable {
    stripes: Vec<Mutex<()>>,
}

impl LockTable {
    pub(crate) fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    pub(crate) fn lock(&self, id: &RecordId) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_of(id)].lock()
    }

    fn stripe_of(&self, id: &RecordId) -> usize {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }
}

/// Held for the duration of one write
///
/// Coarse mode holds the gate exclusively; per-record mode holds the gate
/// shared plus the record's stripe (gate first, stripe second).
pub(crate) enum WriteGuard<'a> {
    Exclusive {
        _gate: RwLockWriteGuard<'a, ()>,
    },
    Record {
        _gate: RwLockReadGuard<'a, ()>,
        _stripe: MutexGuard<'a, ()>,
    },
}
