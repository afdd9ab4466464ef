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

//! User records and the per-user freshness bookkeeping stored on them.
//!
//! Every user record owned by the host may carry one reserved field,
//! [`STORAGE_KEY`], whose value maps each [`TrackerId`] to the [`Digest`] of
//! the last asset version successfully delivered to that user. The host owns
//! the records; trackers only ever merge their own entry into that field.
//!
//! [`Digest`]: crate::asset::Digest

mod record;
mod store;

pub use record::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The reserved user-record field holding freshness entries.
pub const STORAGE_KEY: &str = "keep-fresh";

/// The identifier of a user in the host's store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Names one independent freshness stream, e.g. `"models"` or `"colors"`.
///
/// Several trackers may share a host; each one owns a distinct entry under
/// [`STORAGE_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackerId(String);

impl TrackerId {
    /// Creates a tracker id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
