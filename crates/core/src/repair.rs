//! Repair planning for stale pointers and selection entries.
//!
//! Settings blobs written by older clients (or left behind by failed
//! uploads) can contain pointers whose resource no longer exists, and
//! selection entries referencing ids that never resolve. The repair
//! pass removes the former and remaps the latter. Planning is pure;
//! the driver in `refsync-reconciler` decides when to run it and
//! persists the result.

use std::collections::HashSet;

use crate::pointer::{HydratedReference, Pointer};
use crate::selection::{fallback_reference, SelectionMap};
use crate::types::{PointerId, ShotKey};

// ---------------------------------------------------------------------------
// Preconditions
// ---------------------------------------------------------------------------

/// Whether the repair pass may run now.
///
/// All of these must hold, otherwise the pass is deferred:
/// 1. the resource collection fetch is not outstanding — hydration is a
///    pure join, so once the fetch has settled every pointer has had its
///    chance to resolve and an unresolved one is definitively dead (this
///    is the guard against deleting pointers that are simply in flight),
/// 2. the settings blob has been fetched at least once,
/// 3. there is at least one non-legacy pointer.
pub fn repair_preconditions_met(
    hydration_loading: bool,
    settings_fetched: bool,
    pointers: &[Pointer],
) -> bool {
    let non_legacy = pointers.iter().filter(|p| !p.is_legacy()).count();
    !hydration_loading && settings_fetched && non_legacy > 0
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Computed repair actions. Empty plan means the data is already clean.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepairPlan {
    /// Pointers whose `resource_id` never resolved; to be removed.
    pub remove: Vec<PointerId>,
    /// Selection entries to rewrite, in deterministic shot-key order.
    pub reassign: Vec<(ShotKey, Option<PointerId>)>,
}

impl RepairPlan {
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty() && self.reassign.is_empty()
    }
}

/// Compute removals and selection reassignments.
///
/// Idempotent: planning against already-repaired data yields an empty
/// plan. Reassigned entries point at the same reference the fallback
/// policy would choose (or `None` when nothing remains), so the
/// displayed selection does not change when the repair lands.
pub fn plan_repair(
    pointers: &[Pointer],
    hydrated: &[HydratedReference],
    selection: &SelectionMap,
) -> RepairPlan {
    let hydrated_ids: HashSet<&str> = hydrated.iter().map(|h| h.id()).collect();

    let remove: Vec<PointerId> = pointers
        .iter()
        .filter(|p| p.resource_id.is_some() && !hydrated_ids.contains(p.id.as_str()))
        .map(|p| p.id.clone())
        .collect();

    // Selections referencing a legacy pointer stay put: the pending
    // migration will make the id hydratable without a remap.
    let valid_ids: HashSet<&str> = hydrated_ids
        .iter()
        .copied()
        .chain(
            pointers
                .iter()
                .filter(|p| p.is_legacy())
                .map(|p| p.id.as_str()),
        )
        .collect();

    let replacement: Option<PointerId> =
        fallback_reference(hydrated).map(|h| h.id().to_string());

    let mut reassign: Vec<(ShotKey, Option<PointerId>)> = selection
        .iter()
        .filter_map(|(shot, selected)| match selected {
            Some(id) if !valid_ids.contains(id.as_str()) => {
                Some((shot.clone(), replacement.clone()))
            }
            _ => None,
        })
        .collect();
    // HashMap iteration order is arbitrary; make the plan deterministic.
    reassign.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));

    RepairPlan { remove, reassign }
}

/// Apply a plan, yielding the repaired pointer list and selection map.
pub fn apply_repair(
    pointers: &[Pointer],
    selection: &SelectionMap,
    plan: &RepairPlan,
) -> (Vec<Pointer>, SelectionMap) {
    let removed: HashSet<&str> = plan.remove.iter().map(String::as_str).collect();
    let pointers: Vec<Pointer> = pointers
        .iter()
        .filter(|p| !removed.contains(p.id.as_str()))
        .cloned()
        .collect();

    let mut selection = selection.clone();
    for (shot, replacement) in &plan.reassign {
        selection.insert(shot.clone(), replacement.clone());
    }
    (pointers, selection)
}
