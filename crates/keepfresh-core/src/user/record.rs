// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::{TrackerId, UserId, STORAGE_KEY};
use crate::asset::Digest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A user as stored by the host.
///
/// Apart from its id the record is free-form; the freshness system only reads
/// and writes the [`STORAGE_KEY`] field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// The user's identifier.
    pub id: UserId,

    /// Every other field of the record, as stored by the host.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl UserRecord {
    /// Creates a record with no fields besides its id.
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style setter for an arbitrary field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Reads the user's freshness entries.
    ///
    /// A missing or malformed [`STORAGE_KEY`] field reads as an empty record.
    pub fn freshness(&self) -> FreshnessRecord {
        self.fields
            .get(STORAGE_KEY)
            .map(FreshnessRecord::from_value)
            .unwrap_or_default()
    }

    /// Returns `true` only if the stored digest for `tracker` equals `digest`.
    ///
    /// A user who never received the tracker's asset is always stale.
    pub fn is_fresh(&self, tracker: &TrackerId, digest: &Digest) -> bool {
        self.fields
            .get(STORAGE_KEY)
            .and_then(Value::as_object)
            .and_then(|bin| bin.get(tracker.as_str()))
            .and_then(Value::as_str)
            .is_some_and(|stored| digest == stored)
    }

    /// Records that `digest` was delivered for `tracker`.
    ///
    /// Creates the [`STORAGE_KEY`] field if the user has none yet, and replaces
    /// it if it holds something other than an object.
    pub fn record_delivery(&mut self, tracker: &TrackerId, digest: &Digest) {
        self.apply_patch(&freshness_patch(tracker, digest));
    }

    /// Applies a JSON merge patch to the record's fields.
    ///
    /// The `id` key is never patched.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            if key == "id" {
                continue;
            }
            merge_value(&mut self.fields, key, value);
        }
    }
}

/// The tracker-to-digest map stored under [`STORAGE_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FreshnessRecord(BTreeMap<TrackerId, Digest>);

impl FreshnessRecord {
    /// Parses the stored field, skipping entries that are not strings.
    pub fn from_value(value: &Value) -> Self {
        let Some(bin) = value.as_object() else {
            return Self::default();
        };
        let entries = bin
            .iter()
            .filter_map(|(tracker, digest)| {
                let digest = serde_json::from_value(digest.clone()).ok()?;
                Some((TrackerId::new(tracker.as_str()), digest))
            })
            .collect();
        Self(entries)
    }

    /// Returns the last delivered digest for `tracker`, if any.
    pub fn get(&self, tracker: &TrackerId) -> Option<&Digest> {
        self.0.get(tracker)
    }

    /// Returns the number of trackers recorded.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing has ever been delivered to this user.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the recorded trackers and their digests.
    pub fn iter(&self) -> impl Iterator<Item = (&TrackerId, &Digest)> {
        self.0.iter()
    }
}

/// Builds the merge patch that records `digest` for `tracker`.
///
/// The patch only touches the tracker's own entry, so trackers sharing
/// [`STORAGE_KEY`] never overwrite one another.
pub fn freshness_patch(tracker: &TrackerId, digest: &Digest) -> Map<String, Value> {
    let mut bin = Map::new();
    bin.insert(
        tracker.as_str().to_string(),
        Value::String(digest.as_str().to_string()),
    );
    let mut patch = Map::new();
    patch.insert(STORAGE_KEY.to_string(), Value::Object(bin));
    patch
}

/// Applies a JSON merge patch (RFC 7396) onto an object in place.
///
/// Nested objects are merged key by key, `null` deletes, anything else
/// replaces the target value.
pub fn apply_merge_patch(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        merge_value(target, key, value);
    }
}

fn merge_value(target: &mut Map<String, Value>, key: &str, value: &Value) {
    match value {
        Value::Null => {
            target.remove(key);
        }
        Value::Object(nested) => {
            let slot = target
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                apply_merge_patch(inner, nested);
            }
        }
        other => {
            target.insert(key.to_string(), other.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::digest;
    use serde_json::json;

    fn models() -> TrackerId {
        TrackerId::from("models")
    }

    #[test]
    fn test_missing_record_is_stale() {
        let user = UserRecord::new("ted");
        let d = digest(&json!([{ "id": "a" }])).unwrap();
        assert!(!user.is_fresh(&models(), &d));
        assert!(user.freshness().is_empty());
    }

    #[test]
    fn test_missing_tracker_entry_is_stale() {
        let d = digest(&json!([{ "id": "a" }])).unwrap();
        let mut user = UserRecord::new("ted");
        user.record_delivery(&TrackerId::from("colors"), &d);
        assert!(!user.is_fresh(&models(), &d));
    }

    #[test]
    fn test_record_delivery_creates_namespace_lazily() {
        let d = digest(&json!({ "k": 1 })).unwrap();
        let mut user = UserRecord::new("ted").with_field("name", json!("Ted"));
        user.record_delivery(&models(), &d);

        assert!(user.is_fresh(&models(), &d));
        assert_eq!(user.freshness().get(&models()), Some(&d));
        assert_eq!(user.fields["name"], "Ted");
    }

    #[test]
    fn test_record_delivery_replaces_malformed_namespace() {
        let d = digest(&json!({ "k": 1 })).unwrap();
        let mut user = UserRecord::new("ted").with_field(STORAGE_KEY, json!("garbage"));
        assert!(user.freshness().is_empty());

        user.record_delivery(&models(), &d);
        assert!(user.is_fresh(&models(), &d));
    }

    #[test]
    fn test_trackers_do_not_clobber_each_other() {
        let first = digest(&json!([1])).unwrap();
        let second = digest(&json!([2])).unwrap();
        let colors = TrackerId::from("colors");

        let mut user = UserRecord::new("ted");
        user.record_delivery(&models(), &first);
        user.record_delivery(&colors, &second);

        let record = user.freshness();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get(&models()), Some(&first));
        assert_eq!(record.get(&colors), Some(&second));
    }

    #[test]
    fn test_apply_patch_never_touches_id() {
        let mut user = UserRecord::new("ted");
        let mut patch = Map::new();
        patch.insert("id".to_string(), json!("mallory"));
        patch.insert("role".to_string(), json!("admin"));
        user.apply_patch(&patch);

        assert_eq!(user.id, UserId::from("ted"));
        assert!(!user.fields.contains_key("id"));
        assert_eq!(user.fields["role"], "admin");
    }

    #[test]
    fn test_merge_patch_null_deletes() {
        let mut target = json!({ "a": 1, "b": { "c": 2, "d": 3 } })
            .as_object()
            .cloned()
            .unwrap();
        let patch = json!({ "a": null, "b": { "d": null, "e": 4 } })
            .as_object()
            .cloned()
            .unwrap();
        apply_merge_patch(&mut target, &patch);
        assert_eq!(Value::Object(target), json!({ "b": { "c": 2, "e": 4 } }));
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let d = digest(&json!([])).unwrap();
        let mut user = UserRecord::new("ted").with_field("name", json!("Ted"));
        user.record_delivery(&models(), &d);

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["id"], "ted");
        assert_eq!(value[STORAGE_KEY]["models"], d.as_str());

        let parsed: UserRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, user);
    }
}
