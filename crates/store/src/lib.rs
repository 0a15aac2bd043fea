//! Store boundary for the refsync core.
//!
//! Defines the abstract traits the reconciler consumes — the remote
//! settings store, the resource collection, and the estimation service
//! — together with in-memory implementations used by tests and local
//! mode, and the synchronous local cache mirror.

pub mod error;
pub mod estimation;
pub mod mirror;
pub mod resources;
pub mod settings;

pub use error::StoreError;
pub use estimation::{EstimationService, MemoryEstimationService};
pub use mirror::CacheMirror;
pub use resources::{MemoryResourceStore, ResourceStore, KIND_REFERENCE_IMAGE};
pub use settings::{MemorySettingsStore, Scope, SettingsStore};
