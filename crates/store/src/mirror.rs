//! Local cache mirror: synchronous reads over the last known settings.
//!
//! The mirror lets a burst of local mutations compute its next state
//! without waiting on network round-trips. Writes are optimistic: they
//! land here immediately and mark the scope dirty for the persistence
//! gateway. There is no rollback on remote failure — display continuity
//! wins, and the next successful remote read overwrites the mirror via
//! [`CacheMirror::replace`].

use std::collections::{HashMap, HashSet};

use refsync_core::merge::{shallow_merge, Blob};

use crate::settings::Scope;

#[derive(Debug, Default)]
pub struct CacheMirror {
    blobs: HashMap<Scope, Blob>,
    dirty: HashSet<Scope>,
}

impl CacheMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known value for `scope`. `None` only before the first fetch
    /// resolves. Never blocks.
    pub fn read(&self, scope: &Scope) -> Option<&Blob> {
        self.blobs.get(scope)
    }

    /// Apply `updater` to the current value and shallow-merge its result
    /// in, immediately, before any network confirmation.
    ///
    /// `updater` receives `None` before the first fetch and must be pure:
    /// it may be invoked against a stale snapshot if replayed.
    pub fn write<F>(&mut self, scope: &Scope, updater: F)
    where
        F: FnOnce(Option<&Blob>) -> Blob,
    {
        let patch = updater(self.blobs.get(scope));
        let entry = self.blobs.entry(scope.clone()).or_default();
        shallow_merge(entry, &patch);
        self.dirty.insert(scope.clone());
    }

    /// Overwrite with a fresh remote read. Clears the dirty flag: the
    /// remote value is now the truth.
    pub fn replace(&mut self, scope: &Scope, blob: Blob) {
        self.blobs.insert(scope.clone(), blob);
        self.dirty.remove(scope);
    }

    /// `true` if `scope` has optimistic writes not yet drained.
    pub fn is_dirty(&self, scope: &Scope) -> bool {
        self.dirty.contains(scope)
    }

    /// Drain the scopes written since the last call.
    pub fn take_dirty(&mut self) -> Vec<Scope> {
        self.dirty.drain().collect()
    }
}
