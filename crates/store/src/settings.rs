//! Remote settings store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use refsync_core::merge::{shallow_merge, Blob};
use refsync_core::types::ProjectId;
use tokio::sync::RwLock;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Key for one settings blob: a project, optionally narrowed to a shot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub project_id: ProjectId,
    pub shot_id: Option<String>,
}

impl Scope {
    /// Project-level scope.
    pub fn project(project_id: impl Into<ProjectId>) -> Self {
        Self { project_id: project_id.into(), shot_id: None }
    }

    /// Scope narrowed to one shot of a project.
    pub fn shot(project_id: impl Into<ProjectId>, shot_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            shot_id: Some(shot_id.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The hosted settings store. Reads are cacheable; writes are partial
/// and must never clobber fields absent from the update.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the current blob for `scope`, or `None` if never written.
    async fn get(&self, scope: &Scope) -> Result<Option<Blob>, StoreError>;

    /// Merge `partial` into the stored blob, field by field. Explicit
    /// `null` fields are stored, not dropped.
    async fn set_partial(&self, scope: &Scope, partial: Blob) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory settings store for tests and local mode.
///
/// Writes can be made to fail via [`set_fail_writes`](Self::set_fail_writes)
/// to exercise the optimistic-retention paths.
#[derive(Default)]
pub struct MemorySettingsStore {
    blobs: RwLock<HashMap<Scope, Blob>>,
    fail_writes: AtomicBool,
    write_count: AtomicUsize,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail with [`StoreError::WriteFailed`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a blob directly, bypassing merge semantics.
    pub async fn seed(&self, scope: Scope, blob: Blob) {
        self.blobs.write().await.insert(scope, blob);
    }

    /// Current stored blob, for assertions.
    pub async fn snapshot(&self, scope: &Scope) -> Option<Blob> {
        self.blobs.read().await.get(scope).cloned()
    }

    /// Number of write attempts seen so far (including failed ones).
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Number of scopes with stored blobs.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, scope: &Scope) -> Result<Option<Blob>, StoreError> {
        Ok(self.blobs.read().await.get(scope).cloned())
    }

    async fn set_partial(&self, scope: &Scope, partial: Blob) -> Result<(), StoreError> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed(
                "settings write rejected (injected failure)".to_string(),
            ));
        }
        let mut blobs = self.blobs.write().await;
        let entry = blobs.entry(scope.clone()).or_default();
        shallow_merge(entry, &partial);
        Ok(())
    }
}
