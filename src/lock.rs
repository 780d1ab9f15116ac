//! Per-name construction mutex directory.

use crate::name::Name;
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Hands out one mutex per component [Name], created on demand. The resolver
/// holds a name's mutex only while constructing that component; once the
/// component is stored, the entry is released and later resolutions
/// short-circuit through the store without ever touching this directory.
#[derive(Default)]
pub struct LockManager {
    locks: Mutex<FxHashMap<Name, Arc<Mutex<()>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex dedicated to `name`, creating it if absent. The
    /// coarse guard protects only the directory itself, never construction.
    pub fn lock_for(&self, name: &Name) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(name) {
            return Arc::clone(lock);
        }

        let lock = Arc::new(Mutex::new(()));
        locks.insert(name.clone(), Arc::clone(&lock));
        lock
    }

    /// Discards the mutex for `name`, if any.
    pub fn release(&self, name: &Name) {
        self.locks.lock().remove(name);
    }
}
