//! Remote resource collection trait and in-memory implementation.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use refsync_core::pointer::Resource;
use refsync_core::types::ResourceId;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Resource kind for full reference-image payloads.
pub const KIND_REFERENCE_IMAGE: &str = "reference-image";

/// The hosted resource collection. Listing may lag behind recent
/// creates; callers must tolerate partial results.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// All resources of `kind` currently visible.
    async fn list(&self, kind: &str) -> Result<Vec<Resource>, StoreError>;

    /// Create a resource and return it with its assigned id.
    async fn create(
        &self,
        kind: &str,
        metadata: serde_json::Value,
    ) -> Result<Resource, StoreError>;

    /// Delete a resource by id. Deleting an unknown id is a no-op.
    async fn delete(&self, id: &ResourceId) -> Result<(), StoreError>;
}

/// In-memory resource collection for tests and local mode.
#[derive(Default)]
pub struct MemoryResourceStore {
    resources: RwLock<Vec<Resource>>,
    fail_creates: AtomicBool,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent creates fail, for migration-failure tests.
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Seed a resource directly with a known id.
    pub async fn insert(&self, resource: Resource) {
        self.resources.write().await.push(resource);
    }

    /// Remove a resource without going through the trait, simulating an
    /// out-of-band deletion by another client.
    pub async fn remove(&self, id: &str) {
        self.resources.write().await.retain(|r| r.id != id);
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn list(&self, kind: &str) -> Result<Vec<Resource>, StoreError> {
        Ok(self
            .resources
            .read()
            .await
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        kind: &str,
        metadata: serde_json::Value,
    ) -> Result<Resource, StoreError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed(
                "resource create rejected (injected failure)".to_string(),
            ));
        }
        let resource = Resource {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            metadata,
        };
        self.resources.write().await.push(resource.clone());
        Ok(resource)
    }

    async fn delete(&self, id: &ResourceId) -> Result<(), StoreError> {
        self.resources.write().await.retain(|r| &r.id != id);
        Ok(())
    }
}
