//! Shallow field-level merge for settings blobs.
//!
//! The merge distinguishes "clear this field" (key present with JSON
//! `null`) from "don't touch this field" (key absent): explicit nulls
//! are stored, not dropped.

/// A settings blob or a partial update to one.
pub type Blob = serde_json::Map<String, serde_json::Value>;

/// Shallow-merge `patch` into `base`, field by field.
///
/// Fields present in `patch` overwrite the corresponding field in
/// `base` wholesale (including explicit `null`); fields absent from
/// `patch` are untouched.
pub fn shallow_merge(base: &mut Blob, patch: &Blob) {
    for (key, value) in patch {
        base.insert(key.clone(), value.clone());
    }
}

/// Coalesce two partial updates into one.
///
/// Equivalent to applying `earlier` then `later`: per-field
/// last-write-wins, non-overlapping fields from both survive.
pub fn coalesce(mut earlier: Blob, later: &Blob) -> Blob {
    shallow_merge(&mut earlier, later);
    earlier
}
