//! Stateful reconciliation layer for refsync.
//!
//! Ties the pure logic from `refsync-core` to the store boundary from
//! `refsync-store`: the debounced persistence gateway, the one-time
//! repair and migration passes, session-scoped guards, and the
//! [`SelectionReconciler`] facade the UI layer talks to.

pub mod config;
pub mod error;
pub mod gateway;
pub mod migration;
pub mod notify;
pub mod reconciler;
pub mod repair;
pub mod session;

pub use config::ReconcilerConfig;
pub use error::ReconcileError;
pub use gateway::PersistenceGateway;
pub use notify::{NotificationBus, NotificationLevel, UserNotification};
pub use reconciler::SelectionReconciler;
pub use session::SessionRegistry;
