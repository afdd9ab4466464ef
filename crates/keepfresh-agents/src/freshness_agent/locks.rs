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

//! Per-user mutual exclusion for the check-deliver-persist sequence.

use keepfresh_core::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// One async mutex per user currently being refreshed.
///
/// Slots are created on demand and dropped as soon as nobody holds or waits
/// on them, so the map only ever contains users with work in flight.
#[derive(Debug, Default)]
pub(crate) struct UserLocks {
    slots: Mutex<HashMap<UserId, Slot>>,
}

impl UserLocks {
    /// Waits for exclusive access to `user`.
    pub async fn lock(&self, user: &UserId) -> UserGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(user.clone()).or_default())
        };
        let guard = Arc::clone(&slot).lock_owned().await;
        UserGuard {
            locks: self,
            user: user.clone(),
            slot,
            guard: Some(guard),
        }
    }

    /// Returns the number of users with a live slot.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive access to one user; released on drop.
pub(crate) struct UserGuard<'a> {
    locks: &'a UserLocks,
    user: UserId,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            if let Some(current) = slots.get(&self.user) {
                if Arc::ptr_eq(current, &self.slot) {
                    slots.remove(&self.user);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slot_is_released_after_use() {
        let locks = UserLocks::default();
        {
            let _guard = locks.lock(&UserId::from("ted")).await;
            assert_eq!(locks.len(), 1);
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_same_user_is_serialized() {
        let locks = Arc::new(UserLocks::default());
        let first = locks.lock(&UserId::from("ted")).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(&UserId::from("ted")).await;
            })
        };

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_different_users_do_not_block() {
        let locks = UserLocks::default();
        let _ted = locks.lock(&UserId::from("ted")).await;
        let _ann = locks.lock(&UserId::from("ann")).await;
        assert_eq!(locks.len(), 2);
    }
}
