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

//! A user store kept entirely in memory.

use async_trait::async_trait;
use keepfresh_core::{StoreError, StoreResult, UserId, UserRecord, UserStore};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

/// In-memory user store using `RwLock<HashMap>`.
///
/// This implementation provides:
/// - Concurrent reads, exclusive writes
/// - Atomic merge-patch (the read-modify-write happens under one write lock)
/// - A write counter, handy for asserting how often a tracker persisted
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
    writes: AtomicUsize,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `users`.
    ///
    /// Seeding does not count as a write.
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();
        Self {
            users: RwLock::new(users),
            writes: AtomicUsize::new(0),
        }
    }

    /// Inserts or replaces a user without counting a write.
    pub fn insert(&self, user: UserRecord) -> StoreResult<()> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::Backend("Failed to acquire write lock".to_string()))?;
        users.insert(user.id.clone(), user);
        Ok(())
    }

    /// Returns the number of `save` and `merge` calls that succeeded.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns the number of stored users.
    pub fn len(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the store holds no users.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        let users = self
            .users
            .read()
            .map_err(|_| StoreError::Backend("Failed to acquire read lock".to_string()))?;
        Ok(users.get(id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<UserRecord>> {
        let users = self
            .users
            .read()
            .map_err(|_| StoreError::Backend("Failed to acquire read lock".to_string()))?;
        Ok(users.values().cloned().collect())
    }

    async fn save(&self, user: &UserRecord) -> StoreResult<()> {
        self.insert(user.clone())?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn merge(&self, id: &UserId, patch: Map<String, Value>) -> StoreResult<UserRecord> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::Backend("Failed to acquire write lock".to_string()))?;
        let user = users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        user.apply_patch(&patch);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepfresh_core::user::freshness_patch;
    use keepfresh_core::{digest, TrackerId};
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_get() {
        let store = InMemoryUserStore::new();
        store.save(&UserRecord::new("ted")).await.unwrap();

        let user = store.get(&UserId::from("ted")).await.unwrap();
        assert_eq!(user, Some(UserRecord::new("ted")));
        assert_eq!(store.write_count(), 1);
        assert!(store.get(&UserId::from("ann")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seeding_is_not_a_write() {
        let store = InMemoryUserStore::with_users([UserRecord::new("a"), UserRecord::new("b")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_merge_keeps_other_trackers() {
        let store = InMemoryUserStore::with_users([UserRecord::new("ted")]);
        let id = UserId::from("ted");
        let models = TrackerId::from("models");
        let colors = TrackerId::from("colors");
        let d1 = digest(&json!([1])).unwrap();
        let d2 = digest(&json!([2])).unwrap();

        store.merge(&id, freshness_patch(&models, &d1)).await.unwrap();
        let user = store.merge(&id, freshness_patch(&colors, &d2)).await.unwrap();

        assert!(user.is_fresh(&models, &d1));
        assert!(user.is_fresh(&colors, &d2));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_merge_unknown_user() {
        let store = InMemoryUserStore::new();
        let err = store
            .merge(&UserId::from("ghost"), Map::new())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound(UserId::from("ghost")));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_len_recovers_from_poisoned_lock() {
        let store = std::sync::Arc::new(InMemoryUserStore::with_users([
            UserRecord::new("ted"),
            UserRecord::new("ann"),
        ]));
        let holder = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _users = holder.users.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(store.users.is_poisoned());
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }
}
