//! Per-shot selection resolution and the deterministic fallback policy.
//!
//! [`resolve`] is the heart of the reconciler: it computes what the UI
//! should display for one shot from the persisted selection, the
//! hydrated reference set, and hydration progress. The caller supplies
//! every input explicitly so the function stays pure and testable.

use std::collections::HashMap;

use crate::hydration::HydrationProgress;
use crate::pointer::HydratedReference;
use crate::types::{PointerId, ShotKey};

/// Persisted mapping from shot to selected pointer id.
///
/// A `None` value means the selection was explicitly cleared; an absent
/// key means no selection was ever made for that shot.
pub type SelectionMap = HashMap<ShotKey, Option<PointerId>>;

// ---------------------------------------------------------------------------
// Selection state
// ---------------------------------------------------------------------------

/// Resolution state for one shot. Shots are tracked independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    /// No hydrated references available yet.
    Unresolved,
    /// The persisted selection resolves to a real hydrated reference.
    Confirmed(PointerId),
    /// The persisted id is not hydrated yet, but more data may still
    /// arrive. Display nothing rather than a wrong fallback.
    StalePending,
    /// No usable persisted selection; the deterministic fallback was
    /// chosen.
    Fallback(PointerId),
}

impl SelectionState {
    /// The pointer id the UI should display, if any.
    pub fn displayed_id(&self) -> Option<&PointerId> {
        match self {
            Self::Confirmed(id) | Self::Fallback(id) => Some(id),
            Self::Unresolved | Self::StalePending => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Fallback policy
// ---------------------------------------------------------------------------

/// Deterministic fallback: the hydrated reference with the latest
/// `created_at`.
///
/// Ties (and missing timestamps) are broken by pointer-list order with
/// the first occurrence winning, so the choice is stable across calls.
pub fn fallback_reference(hydrated: &[HydratedReference]) -> Option<&HydratedReference> {
    let mut best: Option<&HydratedReference> = None;
    for candidate in hydrated {
        match best {
            None => best = Some(candidate),
            // Strictly greater only: earlier list entries win ties.
            Some(current) if candidate.created_at() > current.created_at() => {
                best = Some(candidate)
            }
            Some(_) => {}
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Compute the selection state for one shot.
///
/// - A persisted id that resolves wins outright.
/// - A persisted id that does not resolve while hydration is incomplete
///   yields [`SelectionState::StalePending`]: the id could still appear,
///   so showing a fallback now would flicker.
/// - Otherwise the deterministic fallback is chosen, or
///   [`SelectionState::Unresolved`] if nothing is hydrated.
pub fn resolve(
    persisted: Option<&PointerId>,
    hydrated: &[HydratedReference],
    progress: &HydrationProgress,
) -> SelectionState {
    if let Some(id) = persisted {
        if hydrated.iter().any(|h| h.id() == id) {
            return SelectionState::Confirmed(id.clone());
        }
        if !progress.is_complete() {
            return SelectionState::StalePending;
        }
        // Hydration finished and the id never appeared: the persisted
        // entry is definitively stale. Fall through to the fallback.
    }

    match fallback_reference(hydrated) {
        Some(h) => SelectionState::Fallback(h.id().to_string()),
        None => SelectionState::Unresolved,
    }
}
