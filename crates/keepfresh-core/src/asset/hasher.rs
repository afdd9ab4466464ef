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

use crate::error::FreshnessResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A hex-encoded BLAKE3 hash of an asset's canonical JSON form.
///
/// Two assets that are structurally equal, regardless of the order in which
/// their object keys were inserted, always produce the same digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Hashes a JSON value after canonicalizing it.
    pub fn of_value(value: &Value) -> FreshnessResult<Self> {
        let bytes = canonical_bytes(value)?;
        Ok(Self(blake3::hash(&bytes).to_hex().to_string()))
    }

    /// Returns the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Digest {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Computes the digest of any serializable value.
///
/// # Errors
/// Returns [`FreshnessError::Serialization`](crate::FreshnessError::Serialization)
/// if the value cannot be converted to JSON.
pub fn digest<T: Serialize + ?Sized>(item: &T) -> FreshnessResult<Digest> {
    Digest::of_value(&serde_json::to_value(item)?)
}

/// Serializes a value into compact JSON with object keys sorted recursively.
pub fn canonical_bytes(value: &Value) -> FreshnessResult<Vec<u8>> {
    let mut out = Vec::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            // serde_json only sorts keys when `preserve_order` is off.
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(item, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}
