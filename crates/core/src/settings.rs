//! Typed view of the reconciler-owned fields in the settings blob.
//!
//! The remote settings blob is shared with the rest of the application;
//! this module only reads and patches the two fields the reconciler
//! owns. All writes go out as partial updates so sibling fields are
//! never clobbered.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::merge::Blob;
use crate::pointer::Pointer;
use crate::selection::SelectionMap;

/// Blob field holding the pointer list.
pub const POINTERS_FIELD: &str = "referencePointers";

/// Blob field holding the per-shot selection map.
pub const SELECTION_FIELD: &str = "shotSelections";

/// The reconciler-owned slice of the project settings blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(rename = "referencePointers", default)]
    pub pointers: Vec<Pointer>,
    #[serde(rename = "shotSelections", default)]
    pub selection: SelectionMap,
}

impl ProjectSettings {
    /// Extract the reconciler-owned fields from a full blob.
    ///
    /// Unknown sibling fields are ignored here and preserved by the
    /// field-level merge on write.
    pub fn from_blob(blob: &Blob) -> Result<Self, CoreError> {
        serde_json::from_value(serde_json::Value::Object(blob.clone()))
            .map_err(|e| CoreError::Validation(format!("Malformed settings blob: {e}")))
    }
}

/// Partial update replacing only the pointer list.
pub fn pointers_patch(pointers: &[Pointer]) -> Result<Blob, CoreError> {
    let mut patch = Blob::new();
    patch.insert(POINTERS_FIELD.into(), to_value(pointers)?);
    Ok(patch)
}

/// Partial update replacing only the selection map.
pub fn selection_patch(selection: &SelectionMap) -> Result<Blob, CoreError> {
    let mut patch = Blob::new();
    patch.insert(SELECTION_FIELD.into(), to_value(selection)?);
    Ok(patch)
}

/// Partial update replacing both fields at once, for changes that must
/// land atomically (repair, deletion).
pub fn settings_patch(
    pointers: &[Pointer],
    selection: &SelectionMap,
) -> Result<Blob, CoreError> {
    let mut patch = pointers_patch(pointers)?;
    patch.insert(SELECTION_FIELD.into(), to_value(selection)?);
    Ok(patch)
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(value)
        .map_err(|e| CoreError::Validation(format!("Unserializable settings field: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ShotKey;
    use serde_json::json;

    fn blob(v: serde_json::Value) -> Blob {
        v.as_object().cloned().expect("test blob must be an object")
    }

    #[test]
    fn from_blob_tolerates_missing_fields() {
        let settings = ProjectSettings::from_blob(&blob(json!({ "theme": "dark" }))).unwrap();
        assert!(settings.pointers.is_empty());
        assert!(settings.selection.is_empty());
    }

    #[test]
    fn from_blob_reads_persisted_fields() {
        let settings = ProjectSettings::from_blob(&blob(json!({
            "referencePointers": [
                { "id": "p1", "resourceId": "r1" }
            ],
            "shotSelections": { "none": "p1", "shot-2": null },
            "unrelated": 42
        })))
        .unwrap();
        assert_eq!(settings.pointers.len(), 1);
        assert_eq!(
            settings.selection.get(&ShotKey::None),
            Some(&Some("p1".to_string()))
        );
        assert_eq!(settings.selection.get(&ShotKey::shot("shot-2")), Some(&None));
    }

    #[test]
    fn from_blob_rejects_malformed_pointer_list() {
        let result = ProjectSettings::from_blob(&blob(json!({
            "referencePointers": "not-a-list"
        })));
        assert!(result.is_err());
    }

    #[test]
    fn patches_touch_only_their_field() {
        let patch = pointers_patch(&[]).unwrap();
        assert_eq!(patch.len(), 1);
        assert!(patch.contains_key(POINTERS_FIELD));

        let patch = selection_patch(&SelectionMap::new()).unwrap();
        assert_eq!(patch.len(), 1);
        assert!(patch.contains_key(SELECTION_FIELD));

        let patch = settings_patch(&[], &SelectionMap::new()).unwrap();
        assert_eq!(patch.len(), 2);
    }

    #[test]
    fn settings_round_trip_through_patch() {
        let pointer = Pointer::new("r1", chrono::Utc::now());
        let mut selection = SelectionMap::new();
        selection.insert(ShotKey::None, Some(pointer.id.clone()));

        let patch = settings_patch(std::slice::from_ref(&pointer), &selection).unwrap();
        let settings = ProjectSettings::from_blob(&patch).unwrap();
        assert_eq!(settings.pointers, vec![pointer]);
        assert_eq!(settings.selection, selection);
    }
}
