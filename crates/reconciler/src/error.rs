use refsync_core::error::CoreError;
use refsync_store::StoreError;

/// Errors surfaced by the stateful reconciliation layer.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
