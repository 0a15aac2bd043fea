//! Joining pointers against the remote resource collection.
//!
//! Hydration is a pure join: identical `(pointers, resources)` inputs
//! always yield an identical outcome. The resource collection is
//! fetched independently and may be incomplete at the time of the join;
//! [`HydrationProgress`] makes that explicit instead of leaving callers
//! to compare counts ad hoc.

use std::collections::HashMap;

use crate::pointer::{HydratedReference, Pointer, Resource};

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// How far hydration has come for one pointer list.
///
/// `total` counts only non-legacy pointers: legacy records carry their
/// payload inline and can never resolve against the collection, so they
/// would otherwise keep progress incomplete forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydrationProgress {
    pub total: usize,
    pub resolved: usize,
}

impl HydrationProgress {
    /// `true` once every resolvable pointer has been resolved.
    pub fn is_complete(&self) -> bool {
        self.resolved >= self.total
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of joining a pointer list against the resource collection.
#[derive(Debug, Clone, PartialEq)]
pub struct HydrationOutcome {
    /// One entry per pointer whose resource resolved, in pointer-list
    /// order. Unresolvable pointers are dropped, never padded with
    /// placeholders.
    pub hydrated: Vec<HydratedReference>,
    pub progress: HydrationProgress,
    /// `true` if any pointer still carries an inline legacy payload,
    /// signalling that the one-time migration should run.
    pub has_legacy: bool,
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Join `pointers` against `resources` by `resource_id`.
pub fn hydrate(pointers: &[Pointer], resources: &[Resource]) -> HydrationOutcome {
    let by_id: HashMap<&str, &Resource> =
        resources.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut hydrated = Vec::new();
    let mut total = 0;
    let mut has_legacy = false;

    for pointer in pointers {
        if pointer.is_legacy() {
            has_legacy = true;
            continue;
        }
        total += 1;
        let Some(resource_id) = pointer.resource_id.as_deref() else {
            continue;
        };
        if let Some(resource) = by_id.get(resource_id) {
            hydrated.push(HydratedReference {
                pointer: pointer.clone(),
                resource: (*resource).clone(),
            });
        }
    }

    let resolved = hydrated.len();
    HydrationOutcome {
        hydrated,
        progress: HydrationProgress { total, resolved },
        has_legacy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::UsageOverrides;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn pointer(id: &str, resource_id: &str, secs: i64) -> Pointer {
        Pointer {
            id: id.into(),
            resource_id: Some(resource_id.into()),
            created_at: Some(Utc.timestamp_opt(secs, 0).unwrap()),
            overrides: UsageOverrides::default(),
            legacy_payload: None,
        }
    }

    fn legacy_pointer(id: &str) -> Pointer {
        Pointer {
            id: id.into(),
            resource_id: None,
            created_at: None,
            overrides: UsageOverrides::default(),
            legacy_payload: Some(json!({ "imageUrl": "inline" })),
        }
    }

    fn resource(id: &str) -> Resource {
        Resource {
            id: id.into(),
            kind: "reference-image".into(),
            metadata: json!({ "name": id }),
        }
    }

    #[test]
    fn resolves_all_when_collection_complete() {
        let pointers = vec![pointer("p1", "r1", 1), pointer("p2", "r2", 2)];
        let resources = vec![resource("r1"), resource("r2")];
        let out = hydrate(&pointers, &resources);
        assert_eq!(out.hydrated.len(), 2);
        assert!(out.progress.is_complete());
        assert!(!out.has_legacy);
    }

    #[test]
    fn drops_unresolvable_pointers_without_placeholders() {
        let pointers = vec![pointer("p1", "r1", 1), pointer("p2", "r-missing", 2)];
        let resources = vec![resource("r1")];
        let out = hydrate(&pointers, &resources);
        assert_eq!(out.hydrated.len(), 1);
        assert_eq!(out.hydrated[0].id(), "p1");
        assert_eq!(out.progress, HydrationProgress { total: 2, resolved: 1 });
        assert!(!out.progress.is_complete());
    }

    #[test]
    fn legacy_pointers_excluded_from_progress() {
        let pointers = vec![legacy_pointer("p0"), pointer("p1", "r1", 1)];
        let resources = vec![resource("r1")];
        let out = hydrate(&pointers, &resources);
        assert_eq!(out.progress, HydrationProgress { total: 1, resolved: 1 });
        assert!(out.progress.is_complete());
        assert!(out.has_legacy);
    }

    #[test]
    fn preserves_pointer_list_order() {
        let pointers = vec![
            pointer("p3", "r3", 3),
            pointer("p1", "r1", 1),
            pointer("p2", "r2", 2),
        ];
        let resources = vec![resource("r1"), resource("r2"), resource("r3")];
        let out = hydrate(&pointers, &resources);
        let ids: Vec<&str> = out.hydrated.iter().map(|h| h.id()).collect();
        assert_eq!(ids, vec!["p3", "p1", "p2"]);
    }

    #[test]
    fn identical_inputs_yield_identical_outcome() {
        let pointers = vec![pointer("p1", "r1", 1), pointer("p2", "r2", 2)];
        let resources = vec![resource("r2"), resource("r1")];
        assert_eq!(hydrate(&pointers, &resources), hydrate(&pointers, &resources));
    }

    #[test]
    fn empty_inputs_are_complete_and_empty() {
        let out = hydrate(&[], &[]);
        assert!(out.hydrated.is_empty());
        assert!(out.progress.is_complete());
        assert!(!out.has_legacy);
    }
}
