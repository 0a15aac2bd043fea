//! Debounced write path back to the remote settings store.
//!
//! [`PersistenceGateway::update`] queues partial updates and coalesces
//! bursts within the debounce window into a single remote write.
//! Coalescing is field-level: a later patch's fields overwrite an
//! earlier one's, non-overlapping fields from both survive, so
//! superseded in-flight writes are harmless. Failed writes keep the
//! optimistic local state and surface a user notification; the next
//! successful remote read reconciles truth.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use refsync_core::merge::{shallow_merge, Blob};
use refsync_store::{Scope, SettingsStore, StoreError};
use tokio_util::sync::CancellationToken;

use crate::notify::NotificationBus;

pub struct PersistenceGateway {
    store: Arc<dyn SettingsStore>,
    pending: Arc<Mutex<HashMap<Scope, Blob>>>,
    debounce: Duration,
    notify: NotificationBus,
    /// Cancelled during shutdown; pending flush timers fire immediately.
    cancel: CancellationToken,
}

impl PersistenceGateway {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        debounce: Duration,
        notify: NotificationBus,
    ) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(HashMap::new())),
            debounce,
            notify,
            cancel: CancellationToken::new(),
        }
    }

    /// Queue a partial update for `scope`.
    ///
    /// The first patch for a scope arms a flush timer; patches arriving
    /// while the timer runs merge into the pending one. Must be called
    /// from within a tokio runtime.
    pub fn update(&self, scope: &Scope, partial: Blob) {
        let mut pending = lock(&self.pending);
        match pending.get_mut(scope) {
            Some(queued) => shallow_merge(queued, &partial),
            None => {
                pending.insert(scope.clone(), partial);
                self.arm_flush_timer(scope.clone());
            }
        }
    }

    /// Write `partial` immediately, folding in anything already pending
    /// for the scope so ordering is preserved.
    ///
    /// Used for changes that must land atomically and observably, such
    /// as the repair pass.
    pub async fn write_now(&self, scope: &Scope, partial: Blob) -> Result<(), StoreError> {
        let merged = {
            let mut pending = lock(&self.pending);
            let mut merged = pending.remove(scope).unwrap_or_default();
            shallow_merge(&mut merged, &partial);
            merged
        };
        self.store.set_partial(scope, merged).await
    }

    /// `true` if a patch is queued for `scope`.
    pub fn has_pending(&self, scope: &Scope) -> bool {
        lock(&self.pending).contains_key(scope)
    }

    /// Flush everything still pending and make armed timers fire
    /// immediately. Call before dropping the gateway.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let scopes: Vec<Scope> = lock(&self.pending).keys().cloned().collect();
        for scope in scopes {
            flush_scope(&*self.store, &self.pending, &self.notify, &scope).await;
        }
    }

    fn arm_flush_timer(&self, scope: Scope) {
        let store = Arc::clone(&self.store);
        let pending = Arc::clone(&self.pending);
        let notify = self.notify.clone();
        let cancel = self.cancel.clone();
        let debounce = self.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => {}
                _ = cancel.cancelled() => {}
            }
            flush_scope(&*store, &pending, &notify, &scope).await;
        });
    }
}

async fn flush_scope(
    store: &dyn SettingsStore,
    pending: &Mutex<HashMap<Scope, Blob>>,
    notify: &NotificationBus,
    scope: &Scope,
) {
    // Whoever removes the patch owns the write; concurrent flushes of
    // the same scope become no-ops.
    let Some(patch) = lock(pending).remove(scope) else {
        return;
    };
    if patch.is_empty() {
        return;
    }
    match store.set_partial(scope, patch).await {
        Ok(()) => {
            tracing::debug!(project_id = %scope.project_id, "Settings patch persisted");
        }
        Err(e) => {
            tracing::warn!(
                project_id = %scope.project_id,
                error = %e,
                "Settings write failed; keeping optimistic local state",
            );
            notify.error(format!("Could not save settings: {e}"));
        }
    }
}

fn lock<'a>(
    pending: &'a Mutex<HashMap<Scope, Blob>>,
) -> std::sync::MutexGuard<'a, HashMap<Scope, Blob>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsync_store::MemorySettingsStore;
    use serde_json::{json, Value};

    fn blob(v: Value) -> Blob {
        v.as_object().cloned().expect("test blob must be an object")
    }

    fn gateway(store: &Arc<MemorySettingsStore>) -> (PersistenceGateway, NotificationBus) {
        let notify = NotificationBus::default();
        let gateway = PersistenceGateway::new(
            Arc::clone(store) as Arc<dyn SettingsStore>,
            Duration::from_millis(400),
            notify.clone(),
        );
        (gateway, notify)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_into_one_write() {
        let store = Arc::new(MemorySettingsStore::new());
        let (gateway, _notify) = gateway(&store);
        let scope = Scope::project("p1");

        gateway.update(&scope, blob(json!({ "a": 1 })));
        gateway.update(&scope, blob(json!({ "b": 2 })));
        gateway.update(&scope, blob(json!({ "a": 3 })));
        assert_eq!(store.write_count(), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(store.write_count(), 1);
        assert_eq!(
            Value::Object(store.snapshot(&scope).await.unwrap()),
            json!({ "a": 3, "b": 2 })
        );
        assert!(!gateway.has_pending(&scope));
    }

    #[tokio::test(start_paused = true)]
    async fn separated_bursts_write_separately() {
        let store = Arc::new(MemorySettingsStore::new());
        let (gateway, _notify) = gateway(&store);
        let scope = Scope::project("p1");

        gateway.update(&scope, blob(json!({ "a": 1 })));
        tokio::time::sleep(Duration::from_millis(500)).await;
        gateway.update(&scope, blob(json!({ "b": 2 })));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(store.write_count(), 2);
        assert_eq!(
            Value::Object(store.snapshot(&scope).await.unwrap()),
            json!({ "a": 1, "b": 2 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_null_rides_through_the_gateway() {
        let store = Arc::new(MemorySettingsStore::new());
        store
            .seed(Scope::project("p1"), blob(json!({ "style": "url", "other": "x" })))
            .await;
        let (gateway, _notify) = gateway(&store);
        let scope = Scope::project("p1");

        gateway.update(&scope, blob(json!({ "style": null })));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(
            Value::Object(store.snapshot(&scope).await.unwrap()),
            json!({ "style": null, "other": "x" })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn write_now_folds_in_pending_patch() {
        let store = Arc::new(MemorySettingsStore::new());
        let (gateway, _notify) = gateway(&store);
        let scope = Scope::project("p1");

        gateway.update(&scope, blob(json!({ "a": 1 })));
        gateway.write_now(&scope, blob(json!({ "b": 2 }))).await.unwrap();

        assert_eq!(
            Value::Object(store.snapshot(&scope).await.unwrap()),
            json!({ "a": 1, "b": 2 })
        );

        // The armed timer finds nothing left to flush.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_notifies_and_moves_on() {
        let store = Arc::new(MemorySettingsStore::new());
        let (gateway, notify) = gateway(&store);
        let mut rx = notify.subscribe();
        let scope = Scope::project("p1");

        store.set_fail_writes(true);
        gateway.update(&scope, blob(json!({ "a": 1 })));
        tokio::time::sleep(Duration::from_millis(500)).await;

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.level, crate::notify::NotificationLevel::Error);
        assert_eq!(store.snapshot(&scope).await, None);

        // Recovery: the next burst writes normally.
        store.set_fail_writes(false);
        gateway.update(&scope, blob(json!({ "a": 2 })));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(
            Value::Object(store.snapshot(&scope).await.unwrap()),
            json!({ "a": 2 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_without_waiting() {
        let store = Arc::new(MemorySettingsStore::new());
        let (gateway, _notify) = gateway(&store);
        let scope = Scope::project("p1");

        gateway.update(&scope, blob(json!({ "a": 1 })));
        gateway.shutdown().await;

        assert_eq!(
            Value::Object(store.snapshot(&scope).await.unwrap()),
            json!({ "a": 1 })
        );
        assert!(!gateway.has_pending(&scope));
    }

    #[tokio::test(start_paused = true)]
    async fn scopes_flush_independently() {
        let store = Arc::new(MemorySettingsStore::new());
        let (gateway, _notify) = gateway(&store);

        gateway.update(&Scope::project("p1"), blob(json!({ "a": 1 })));
        gateway.update(&Scope::project("p2"), blob(json!({ "b": 2 })));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(store.write_count(), 2);
        assert!(store.snapshot(&Scope::project("p1")).await.is_some());
        assert!(store.snapshot(&Scope::project("p2")).await.is_some());
    }
}
