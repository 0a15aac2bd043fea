//! Shared identifier and timestamp types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Client-generated pointer id (UUID v4 string). Stable for the
/// lifetime of the pointer.
pub type PointerId = String;

/// Id of a full resource in the remote resource collection.
pub type ResourceId = String;

/// Project identifier in the remote settings store.
pub type ProjectId = String;

/// Sentinel string for the project-level ("no shot") selection key.
pub const NO_SHOT_KEY: &str = "none";

/// Shot identifier used to key per-shot selections.
///
/// Serializes as a plain string so it can be used directly as a JSON
/// map key in the persisted settings blob; [`ShotKey::None`] maps to
/// the literal `"none"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShotKey {
    /// No shot is active; selection applies at the project level.
    None,
    /// A concrete shot id.
    Shot(String),
}

impl ShotKey {
    /// Build a key for a concrete shot id.
    pub fn shot(id: impl Into<String>) -> Self {
        Self::Shot(id.into())
    }

    /// String form used as the JSON map key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => NO_SHOT_KEY,
            Self::Shot(id) => id,
        }
    }
}

impl From<String> for ShotKey {
    fn from(s: String) -> Self {
        if s == NO_SHOT_KEY {
            Self::None
        } else {
            Self::Shot(s)
        }
    }
}

impl From<ShotKey> for String {
    fn from(key: ShotKey) -> Self {
        key.as_str().to_string()
    }
}

impl fmt::Display for ShotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_key_round_trips_through_sentinel() {
        let key = ShotKey::from("none".to_string());
        assert_eq!(key, ShotKey::None);
        assert_eq!(String::from(key), "none");
    }

    #[test]
    fn shot_key_round_trips() {
        let key = ShotKey::shot("shot-42");
        assert_eq!(key.as_str(), "shot-42");
        assert_eq!(ShotKey::from("shot-42".to_string()), key);
    }

    #[test]
    fn shot_key_serializes_as_json_string() {
        let json = serde_json::to_string(&ShotKey::shot("s1")).unwrap();
        assert_eq!(json, "\"s1\"");
        let json = serde_json::to_string(&ShotKey::None).unwrap();
        assert_eq!(json, "\"none\"");
    }

    #[test]
    fn shot_key_usable_as_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(ShotKey::None, 1);
        map.insert(ShotKey::shot("s1"), 2);
        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::HashMap<ShotKey, i32> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&ShotKey::None), Some(&1));
        assert_eq!(back.get(&ShotKey::shot("s1")), Some(&2));
    }
}
