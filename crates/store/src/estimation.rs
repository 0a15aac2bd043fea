//! Task cost estimation service trait and in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use refsync_core::estimation::TaskEstimate;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// External duration/cost estimation service.
#[async_trait]
pub trait EstimationService: Send + Sync {
    /// Estimate for the given task id.
    async fn estimate(&self, task_id: &str) -> Result<TaskEstimate, StoreError>;
}

/// In-memory estimation service for tests and local mode.
#[derive(Default)]
pub struct MemoryEstimationService {
    estimates: RwLock<HashMap<String, TaskEstimate>>,
}

impl MemoryEstimationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, task_id: impl Into<String>, estimate: TaskEstimate) {
        self.estimates.write().await.insert(task_id.into(), estimate);
    }
}

#[async_trait]
impl EstimationService for MemoryEstimationService {
    async fn estimate(&self, task_id: &str) -> Result<TaskEstimate, StoreError> {
        self.estimates
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| StoreError::Unavailable(format!("no estimate for task {task_id}")))
    }
}
