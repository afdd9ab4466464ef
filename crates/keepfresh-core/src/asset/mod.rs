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

//! Provides the tracked asset value and its content-addressed version identifier.
//!
//! An [`Asset`] is an opaque structured value supplied by an integrator
//! (model definitions, style packs, configuration...). The only thing the
//! freshness system ever does with it is hash it: the resulting [`Digest`] is
//! the canonical version identifier compared against what each user last
//! received.

mod hasher;

pub use hasher::*;

use crate::error::{FreshnessError, FreshnessResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured value kept fresh across users.
///
/// Assets are always a JSON object or an ordered sequence. Scalars are
/// rejected at construction time.
///
/// # Examples
///
/// ```
/// use keepfresh_core::asset::Asset;
/// use serde_json::json;
///
/// let asset = Asset::new(json!([{ "id": "a" }, { "id": "b" }])).unwrap();
/// assert_eq!(asset.as_value()[1]["id"], "b");
///
/// assert!(Asset::new(json!("just a string")).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(Value);

impl Asset {
    /// Wraps a JSON value as an asset.
    ///
    /// # Errors
    /// Returns [`FreshnessError::Configuration`] if the value is neither an
    /// object nor an array.
    pub fn new(value: Value) -> FreshnessResult<Self> {
        match value {
            Value::Object(_) | Value::Array(_) => Ok(Self(value)),
            other => Err(FreshnessError::Configuration(format!(
                "asset must be an object or an array, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// Converts any serializable value into an asset.
    ///
    /// # Errors
    /// Returns [`FreshnessError::Serialization`] if the value cannot be
    /// represented as JSON (e.g. a map with non-string keys), or
    /// [`FreshnessError::Configuration`] if it is not an object or array.
    pub fn from_serialize<T: Serialize + ?Sized>(item: &T) -> FreshnessResult<Self> {
        Self::new(serde_json::to_value(item)?)
    }

    /// Computes the digest identifying this version of the asset.
    pub fn digest(&self) -> FreshnessResult<Digest> {
        Digest::of_value(&self.0)
    }

    /// Returns the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the asset and returns the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_accepts_objects_and_arrays() {
        assert!(Asset::new(json!({ "primary": "#ff0000" })).is_ok());
        assert!(Asset::new(json!([])).is_ok());
    }

    #[test]
    fn test_rejects_scalars() {
        for value in [json!(null), json!(true), json!(3), json!("models")] {
            match Asset::new(value) {
                Err(FreshnessError::Configuration(msg)) => {
                    assert!(msg.starts_with("asset must be an object or an array"))
                }
                other => panic!("expected a configuration error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_from_serialize_rejects_non_string_keys() {
        let mut item = HashMap::new();
        item.insert((1, 2), "tuple keys cannot become JSON");
        assert!(matches!(
            Asset::from_serialize(&item),
            Err(FreshnessError::Serialization(_))
        ));
    }

    #[test]
    fn test_digest_matches_free_function() {
        let asset = Asset::new(json!([{ "id": "a" }])).unwrap();
        assert_eq!(
            asset.digest().unwrap(),
            digest(&json!([{ "id": "a" }])).unwrap()
        );
    }
}
