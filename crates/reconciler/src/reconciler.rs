//! The selection reconciler facade.
//!
//! [`SelectionReconciler`] is the single entry point the form layer
//! talks to. Reads are synchronous against the local cache mirror, so
//! the UI never waits on the network; writes land optimistically in the
//! mirror and drain to the remote store through the debounced gateway.
//! [`refresh`](SelectionReconciler::refresh) pulls fresh remote state
//! and runs the one-time housekeeping passes (legacy migration, repair).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use refsync_core::estimation::{validate_estimate, TaskEstimate};
use refsync_core::error::CoreError;
use refsync_core::hydration::hydrate;
use refsync_core::merge::{shallow_merge, Blob};
use refsync_core::pointer::{Pointer, Resource};
use refsync_core::selection::{resolve, SelectionState};
use refsync_core::settings::{
    pointers_patch, selection_patch, settings_patch, ProjectSettings,
};
use refsync_core::types::{PointerId, ProjectId, ShotKey};
use refsync_store::{
    CacheMirror, EstimationService, ResourceStore, Scope, SettingsStore,
    KIND_REFERENCE_IMAGE,
};
use tokio::sync::broadcast;

use crate::config::ReconcilerConfig;
use crate::error::ReconcileError;
use crate::gateway::PersistenceGateway;
use crate::migration::migrate_legacy_pointers;
use crate::notify::{NotificationBus, UserNotification};
use crate::repair::{run_repair_pass, RepairInputs};
use crate::session::SessionRegistry;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ReconcilerState {
    mirror: CacheMirror,
    /// Last fetched resource collection.
    resources: Vec<Resource>,
    /// The initial resource fetch has completed.
    resources_loaded: bool,
    /// The settings blob has been fetched at least once (possibly empty).
    settings_fetched: bool,
    /// Fallback id shown per shot, kept stable under late hydration
    /// arrivals. Retained across shot switches so switching back does
    /// not recompute.
    fallback_cache: HashMap<ShotKey, PointerId>,
    /// Optimistic selection per shot, shown until the persisted
    /// selection map confirms it.
    optimistic: HashMap<ShotKey, PointerId>,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct SelectionReconciler {
    project_id: ProjectId,
    scope: Scope,
    settings_store: Arc<dyn SettingsStore>,
    resource_store: Arc<dyn ResourceStore>,
    estimation: Arc<dyn EstimationService>,
    gateway: PersistenceGateway,
    session: Arc<SessionRegistry>,
    notify: NotificationBus,
    state: Mutex<ReconcilerState>,
}

impl SelectionReconciler {
    pub fn new(
        project_id: impl Into<ProjectId>,
        settings_store: Arc<dyn SettingsStore>,
        resource_store: Arc<dyn ResourceStore>,
        estimation: Arc<dyn EstimationService>,
        session: Arc<SessionRegistry>,
        config: ReconcilerConfig,
    ) -> Self {
        let project_id = project_id.into();
        let notify = NotificationBus::new(config.notification_capacity);
        let gateway = PersistenceGateway::new(
            Arc::clone(&settings_store),
            config.debounce(),
            notify.clone(),
        );
        Self {
            scope: Scope::project(project_id.clone()),
            project_id,
            settings_store,
            resource_store,
            estimation,
            gateway,
            session,
            notify,
            state: Mutex::new(ReconcilerState::default()),
        }
    }

    /// Subscribe to user-facing notifications (failed saves, migration
    /// give-ups).
    pub fn notifications(&self) -> broadcast::Receiver<UserNotification> {
        self.notify.subscribe()
    }

    // -----------------------------------------------------------------------
    // Remote refresh and housekeeping
    // -----------------------------------------------------------------------

    /// Fetch settings and resources, overwrite the mirror with remote
    /// truth, and run the one-time housekeeping passes.
    ///
    /// A failed fetch leaves prior state untouched: affected shots stay
    /// unresolved and the UI keeps showing its loading affordance.
    pub async fn refresh(&self) -> Result<(), ReconcileError> {
        let settings_blob = self.settings_store.get(&self.scope).await?;
        let resources = self.resource_store.list(KIND_REFERENCE_IMAGE).await?;
        {
            let mut state = self.lock_state();
            if let Some(blob) = settings_blob {
                state.mirror.replace(&self.scope, blob);
            }
            state.settings_fetched = true;
            state.resources = resources;
            state.resources_loaded = true;
        }
        self.run_housekeeping().await
    }

    async fn run_housekeeping(&self) -> Result<(), ReconcileError> {
        let (mut settings, mut resources, settings_fetched, resources_loaded) = {
            let state = self.lock_state();
            let Some(settings) = self.settings_of(&state) else {
                return Ok(());
            };
            (
                settings,
                state.resources.clone(),
                state.settings_fetched,
                state.resources_loaded,
            )
        };

        let outcome = hydrate(&settings.pointers, &resources);
        if outcome.has_legacy {
            let migrated = migrate_legacy_pointers(
                &self.project_id,
                &self.scope,
                &settings.pointers,
                self.resource_store.as_ref(),
                &self.gateway,
                &self.session,
                &self.notify,
            )
            .await?;
            if let Some(rewritten) = migrated {
                self.absorb_persisted(pointers_patch(&rewritten)?);
                settings.pointers = rewritten;
                // Migration created resources; pick them up for the
                // repair pass below.
                resources = self.resource_store.list(KIND_REFERENCE_IMAGE).await?;
                let mut state = self.lock_state();
                state.resources = resources.clone();
            }
        }

        let outcome = hydrate(&settings.pointers, &resources);
        let repaired = run_repair_pass(
            RepairInputs {
                project_id: &self.project_id,
                scope: &self.scope,
                settings_fetched,
                hydration_loading: !resources_loaded,
                pointers: &settings.pointers,
                outcome: &outcome,
                selection: &settings.selection,
            },
            &self.gateway,
            &self.session,
        )
        .await?;
        if let Some((pointers, selection)) = repaired {
            self.absorb_persisted(settings_patch(&pointers, &selection)?);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // UI surface
    // -----------------------------------------------------------------------

    /// The pointer id the UI should show as selected for `shot`, or
    /// `None` while nothing can be shown yet.
    ///
    /// Synchronous: resolves entirely against the local mirror and the
    /// last fetched resource collection.
    pub fn displayed_reference_id(&self, shot: &ShotKey) -> Option<PointerId> {
        let mut state = self.lock_state();
        let settings = self.settings_of(&state)?;
        let outcome = hydrate(&settings.pointers, &state.resources);
        let persisted = settings.selection.get(shot).and_then(|v| v.as_ref());

        // The optimistic override stands in until the persisted map
        // confirms it (or its target disappears).
        if let Some(optimistic) = state.optimistic.get(shot).cloned() {
            if persisted == Some(&optimistic) {
                state.optimistic.remove(shot);
            } else if outcome.hydrated.iter().any(|h| h.id() == optimistic) {
                return Some(optimistic);
            } else {
                state.optimistic.remove(shot);
            }
        }

        match resolve(persisted, &outcome.hydrated, &outcome.progress) {
            SelectionState::Confirmed(id) => {
                // A confirmable persisted selection invalidates any
                // cached fallback for the shot.
                state.fallback_cache.remove(shot);
                Some(id)
            }
            SelectionState::Fallback(id) => {
                if let Some(cached) = state.fallback_cache.get(shot).cloned() {
                    if outcome.hydrated.iter().any(|h| h.id() == cached) {
                        return Some(cached);
                    }
                }
                state.fallback_cache.insert(shot.clone(), id.clone());
                Some(id)
            }
            SelectionState::Unresolved | SelectionState::StalePending => None,
        }
    }

    /// `true` while the displayed selection for `shot` cannot be
    /// trusted yet: initial fetches outstanding, or the persisted
    /// selection is still waiting on hydration.
    pub fn is_reference_data_loading(&self, shot: &ShotKey) -> bool {
        let state = self.lock_state();
        if !state.settings_fetched || !state.resources_loaded {
            return true;
        }
        let Some(settings) = self.settings_of(&state) else {
            return false;
        };
        let outcome = hydrate(&settings.pointers, &state.resources);
        let persisted = settings.selection.get(shot).and_then(|v| v.as_ref());
        matches!(
            resolve(persisted, &outcome.hydrated, &outcome.progress),
            SelectionState::StalePending
        )
    }

    /// Record a user selection for `shot`: shown immediately, persisted
    /// through the debounced gateway.
    pub fn select_reference(&self, shot: &ShotKey, id: &str) -> Result<(), ReconcileError> {
        let mut state = self.lock_state();
        let settings = self.settings_of(&state).unwrap_or_default();
        if !settings.pointers.iter().any(|p| p.id == id) {
            return Err(CoreError::NotFound {
                entity: "reference pointer",
                id: id.to_string(),
            }
            .into());
        }

        let mut selection = settings.selection;
        selection.insert(shot.clone(), Some(id.to_string()));
        state.optimistic.insert(shot.clone(), id.to_string());
        state.fallback_cache.remove(shot);

        let patch = selection_patch(&selection)?;
        self.write_through(&mut state, patch);
        Ok(())
    }

    /// Remove a pointer and clear every selection referencing it. The
    /// underlying shared resource is left in place; other projects may
    /// still use it.
    pub fn delete_reference(&self, id: &str) -> Result<(), ReconcileError> {
        let mut state = self.lock_state();
        let settings = self.settings_of(&state).unwrap_or_default();
        if !settings.pointers.iter().any(|p| p.id == id) {
            return Err(CoreError::NotFound {
                entity: "reference pointer",
                id: id.to_string(),
            }
            .into());
        }

        let pointers: Vec<Pointer> = settings
            .pointers
            .into_iter()
            .filter(|p| p.id != id)
            .collect();
        let mut selection = settings.selection;
        for selected in selection.values_mut() {
            if selected.as_deref() == Some(id) {
                *selected = None;
            }
        }
        state.optimistic.retain(|_, v| v != id);
        state.fallback_cache.retain(|_, v| v != id);

        let patch = settings_patch(&pointers, &selection)?;
        self.write_through(&mut state, patch);
        Ok(())
    }

    /// Fetch and validate a cost estimate for a generation task.
    ///
    /// Failures are user-visible (notification plus error return) and
    /// never touch reconciler state.
    pub async fn task_estimate(&self, task_id: &str) -> Result<TaskEstimate, ReconcileError> {
        let estimate = match self.estimation.estimate(task_id).await {
            Ok(estimate) => estimate,
            Err(e) => {
                self.notify.error(format!("Could not estimate task cost: {e}"));
                return Err(e.into());
            }
        };
        validate_estimate(&estimate)?;
        Ok(estimate)
    }

    /// Flush pending writes. Call before dropping the reconciler.
    pub async fn shutdown(&self) {
        self.gateway.shutdown().await;
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Optimistic write: into the mirror now, out through the gateway
    /// when the debounce window closes.
    fn write_through(&self, state: &mut ReconcilerState, patch: Blob) {
        let optimistic = patch.clone();
        state.mirror.write(&self.scope, move |_| optimistic);
        for scope in state.mirror.take_dirty() {
            self.gateway.update(&scope, patch.clone());
        }
    }

    /// Fold an already-persisted patch into the mirror as remote truth.
    fn absorb_persisted(&self, patch: Blob) {
        let mut state = self.lock_state();
        let mut blob = state.mirror.read(&self.scope).cloned().unwrap_or_default();
        shallow_merge(&mut blob, &patch);
        state.mirror.replace(&self.scope, blob);
    }

    fn settings_of(&self, state: &ReconcilerState) -> Option<ProjectSettings> {
        let blob = state.mirror.read(&self.scope)?;
        match ProjectSettings::from_blob(blob) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(
                    project_id = %self.project_id,
                    error = %e,
                    "Ignoring malformed settings blob",
                );
                None
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ReconcilerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
