//! Session-scoped guards for one-shot housekeeping passes.
//!
//! An explicit registry injected into the reconciler rather than read
//! from ambient global state, so tests control session boundaries by
//! constructing a fresh registry. Scoped to the process: a new session
//! (new registry) allows a fresh attempt at everything.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use refsync_core::types::ProjectId;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    repaired: Mutex<HashSet<ProjectId>>,
    migrated: Mutex<HashSet<ProjectId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the repair slot for `project`. Returns `false` if the
    /// repair pass already ran (or is running) this session.
    pub fn begin_repair(&self, project: &str) -> bool {
        self.lock_repaired().insert(project.to_string())
    }

    /// Release the repair slot after a failed pass so it can be retried.
    pub fn rollback_repair(&self, project: &str) {
        self.lock_repaired().remove(project);
    }

    pub fn is_repaired(&self, project: &str) -> bool {
        self.lock_repaired().contains(project)
    }

    /// Claim the legacy-migration slot for `project`. Returns `false`
    /// if migration was already attempted this session — failed
    /// attempts keep the slot to prevent retry storms; the next session
    /// starts fresh.
    pub fn begin_migration(&self, project: &str) -> bool {
        self.lock_migrated().insert(project.to_string())
    }

    pub fn is_migrated(&self, project: &str) -> bool {
        self.lock_migrated().contains(project)
    }

    fn lock_repaired(&self) -> std::sync::MutexGuard<'_, HashSet<ProjectId>> {
        self.repaired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_migrated(&self) -> std::sync::MutexGuard<'_, HashSet<ProjectId>> {
        self.migrated.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
