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

use super::{UserId, UserRecord};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// The host's user storage, as seen by a freshness tracker.
///
/// Implementations may be backed by anything: an in-memory map, a database,
/// a remote service. No transactional guarantees are assumed; trackers
/// serialize their own per-user read-check-write sequences.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetches a single user, or `None` if the store does not know it.
    async fn get(&self, id: &UserId) -> StoreResult<Option<UserRecord>>;

    /// Returns every known user. No ordering is implied.
    async fn list(&self) -> StoreResult<Vec<UserRecord>>;

    /// Persists a whole user record, inserting it if it is new.
    async fn save(&self, user: &UserRecord) -> StoreResult<()>;

    /// Merges a partial record into an existing user with JSON merge-patch
    /// semantics and returns the updated record.
    ///
    /// The default implementation reads, patches and saves the record without
    /// any atomicity; stores that can do better should override it.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the user does not exist.
    async fn merge(&self, id: &UserId, patch: Map<String, Value>) -> StoreResult<UserRecord> {
        let mut user = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        user.apply_patch(&patch);
        self.save(&user).await?;
        Ok(user)
    }
}
