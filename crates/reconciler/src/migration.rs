//! One-time migration of legacy inline pointers.
//!
//! Older clients embedded the full reference-image payload directly in
//! the settings blob. Migration uploads each inline payload as a proper
//! resource, rewrites the pointer to reference it by id, and persists
//! the rewritten list. Attempted at most once per project per session:
//! a failed attempt keeps the session guard (no retry storms) and the
//! next session starts fresh.

use refsync_core::pointer::Pointer;
use refsync_core::settings::pointers_patch;
use refsync_store::{ResourceStore, Scope, KIND_REFERENCE_IMAGE};

use crate::error::ReconcileError;
use crate::gateway::PersistenceGateway;
use crate::notify::NotificationBus;
use crate::session::SessionRegistry;

/// Migrate the legacy pointers in `pointers`, if any.
///
/// Returns the rewritten pointer list when at least one pointer was
/// migrated, so the caller can refresh its local mirror; `None` when
/// there was nothing to do or the session guard was already taken.
pub async fn migrate_legacy_pointers(
    project_id: &str,
    scope: &Scope,
    pointers: &[Pointer],
    resources: &dyn ResourceStore,
    gateway: &PersistenceGateway,
    session: &SessionRegistry,
    notify: &NotificationBus,
) -> Result<Option<Vec<Pointer>>, ReconcileError> {
    if !pointers.iter().any(Pointer::is_legacy) {
        return Ok(None);
    }
    if !session.begin_migration(project_id) {
        return Ok(None);
    }

    let mut rewritten = pointers.to_vec();
    let mut migrated = 0usize;
    let mut failed = 0usize;

    for pointer in rewritten.iter_mut().filter(|p| p.is_legacy()) {
        let Some(payload) = pointer.legacy_payload.clone() else {
            continue;
        };
        match resources.create(KIND_REFERENCE_IMAGE, payload).await {
            Ok(resource) => {
                pointer.resource_id = Some(resource.id);
                pointer.legacy_payload = None;
                migrated += 1;
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(
                    project_id,
                    pointer_id = %pointer.id,
                    error = %e,
                    "Legacy pointer migration failed",
                );
            }
        }
    }

    if failed > 0 {
        // One non-blocking notification for the whole attempt.
        notify.warn(format!(
            "Could not migrate {failed} legacy reference image(s); will retry next session"
        ));
    }

    if migrated == 0 {
        return if failed > 0 {
            Err(ReconcileError::MigrationFailed(format!(
                "{failed} legacy pointer(s) could not be uploaded"
            )))
        } else {
            Ok(None)
        };
    }

    gateway.write_now(scope, pointers_patch(&rewritten)?).await?;
    tracing::info!(project_id, migrated, failed, "Migrated legacy reference pointers");
    Ok(Some(rewritten))
}
