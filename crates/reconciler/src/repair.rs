//! Driver for the one-time repair pass.
//!
//! Gating, persistence, and session bookkeeping around the pure
//! planning in `refsync_core::repair`. Repair is housekeeping: it runs
//! silently, and a failed write only logs and releases the session
//! guard so a later refresh can retry.

use refsync_core::hydration::HydrationOutcome;
use refsync_core::pointer::Pointer;
use refsync_core::repair::{apply_repair, plan_repair, repair_preconditions_met};
use refsync_core::selection::SelectionMap;
use refsync_core::settings::settings_patch;
use refsync_store::Scope;

use crate::error::ReconcileError;
use crate::gateway::PersistenceGateway;
use crate::session::SessionRegistry;

/// Everything the repair pass needs to decide and act.
pub struct RepairInputs<'a> {
    pub project_id: &'a str,
    pub scope: &'a Scope,
    /// The settings blob has been fetched at least once.
    pub settings_fetched: bool,
    /// The resource collection fetch is still outstanding.
    pub hydration_loading: bool,
    pub pointers: &'a [Pointer],
    pub outcome: &'a HydrationOutcome,
    pub selection: &'a SelectionMap,
}

/// Run the repair pass if its preconditions hold and it has not run
/// this session.
///
/// Returns the repaired `(pointers, selection)` when changes were
/// persisted, so the caller can update its local mirror; `None` when
/// the pass was deferred, already done, or found nothing to fix.
pub async fn run_repair_pass(
    inputs: RepairInputs<'_>,
    gateway: &PersistenceGateway,
    session: &SessionRegistry,
) -> Result<Option<(Vec<Pointer>, SelectionMap)>, ReconcileError> {
    if !repair_preconditions_met(
        inputs.hydration_loading,
        inputs.settings_fetched,
        inputs.pointers,
    ) {
        // Deferred, not skipped: the guard stays free for a later refresh.
        return Ok(None);
    }
    if !session.begin_repair(inputs.project_id) {
        return Ok(None);
    }

    let plan = plan_repair(inputs.pointers, &inputs.outcome.hydrated, inputs.selection);
    if plan.is_noop() {
        tracing::debug!(project_id = inputs.project_id, "Repair pass found nothing to fix");
        return Ok(None);
    }

    let (pointers, selection) = apply_repair(inputs.pointers, inputs.selection, &plan);
    let patch = settings_patch(&pointers, &selection)?;
    if let Err(e) = gateway.write_now(inputs.scope, patch).await {
        session.rollback_repair(inputs.project_id);
        tracing::error!(
            project_id = inputs.project_id,
            error = %e,
            "Repair pass write failed; guard released for retry",
        );
        return Err(e.into());
    }

    tracing::info!(
        project_id = inputs.project_id,
        removed = plan.remove.len(),
        reassigned = plan.reassign.len(),
        "Repaired stale reference pointers",
    );
    Ok(Some((pointers, selection)))
}
