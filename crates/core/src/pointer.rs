//! Reference-image pointer and resource models.
//!
//! A [`Pointer`] is the lightweight record persisted in the project
//! settings blob; the full payload lives in the remote resource
//! collection and is joined back in by the hydrator.

use serde::{Deserialize, Serialize};

use crate::types::{PointerId, ResourceId, Timestamp};

// ---------------------------------------------------------------------------
// Usage overrides
// ---------------------------------------------------------------------------

/// Per-project usage overrides carried on a pointer.
///
/// These apply only in the context of the owning project/shot and must
/// never be written back into the shared resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageOverrides {
    /// How the reference is applied, e.g. `"style"` or `"composition"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Influence strength in `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    /// Free-text notes shown next to the reference in the form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Pointer
// ---------------------------------------------------------------------------

/// Lightweight settings record referencing a full resource stored in the
/// remote resource collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pointer {
    /// Client-generated id, stable across the pointer's lifetime.
    pub id: PointerId,

    /// Id of the full resource. Absent on legacy records that embed the
    /// payload inline instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<ResourceId>,

    /// Creation time, used for deterministic recency ordering. May be
    /// missing on records written by older clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    /// Project-local usage overrides.
    #[serde(default)]
    pub overrides: UsageOverrides,

    /// Full payload embedded by legacy clients. Presence triggers a
    /// one-time migration into the resource collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_payload: Option<serde_json::Value>,
}

impl Pointer {
    /// Create a pointer referencing an existing resource.
    pub fn new(resource_id: impl Into<ResourceId>, created_at: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            resource_id: Some(resource_id.into()),
            created_at: Some(created_at),
            overrides: UsageOverrides::default(),
            legacy_payload: None,
        }
    }

    /// `true` if this is a legacy record carrying its payload inline
    /// rather than referencing a resource by id.
    pub fn is_legacy(&self) -> bool {
        self.resource_id.is_none() && self.legacy_payload.is_some()
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A full resource in the remote resource collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    /// Kind discriminator, e.g. `"reference-image"`.
    pub kind: String,
    /// Payload: image URLs, display name, per-resource defaults.
    pub metadata: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Hydrated reference
// ---------------------------------------------------------------------------

/// A pointer joined with its resolved resource.
///
/// Derived and read-only: recomputed whenever the pointer list or the
/// resource collection changes, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct HydratedReference {
    pub pointer: Pointer,
    pub resource: Resource,
}

impl HydratedReference {
    /// The owning pointer's id.
    pub fn id(&self) -> &str {
        &self.pointer.id
    }

    /// Creation time of the owning pointer.
    pub fn created_at(&self) -> Option<Timestamp> {
        self.pointer.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pointer_with_resource_id_is_not_legacy() {
        let p = Pointer::new("r1", chrono::Utc::now());
        assert!(!p.is_legacy());
    }

    #[test]
    fn pointer_with_inline_payload_is_legacy() {
        let p = Pointer {
            id: "p1".into(),
            resource_id: None,
            created_at: None,
            overrides: UsageOverrides::default(),
            legacy_payload: Some(json!({ "imageUrl": "https://img/x.png" })),
        };
        assert!(p.is_legacy());
    }

    #[test]
    fn pointer_serializes_camel_case() {
        let p = Pointer::new("r1", chrono::Utc::now());
        let v = serde_json::to_value(&p).unwrap();
        assert!(v.get("resourceId").is_some());
        assert!(v.get("createdAt").is_some());
        assert!(v.get("legacyPayload").is_none());
    }

    #[test]
    fn pointer_deserializes_minimal_legacy_record() {
        let v = json!({ "id": "p1", "legacyPayload": { "imageUrl": "u" } });
        let p: Pointer = serde_json::from_value(v).unwrap();
        assert!(p.is_legacy());
        assert!(p.created_at.is_none());
        assert_eq!(p.overrides, UsageOverrides::default());
    }

    #[test]
    fn fresh_pointers_get_distinct_ids() {
        let now = chrono::Utc::now();
        let a = Pointer::new("r1", now);
        let b = Pointer::new("r1", now);
        assert_ne!(a.id, b.id);
    }
}
