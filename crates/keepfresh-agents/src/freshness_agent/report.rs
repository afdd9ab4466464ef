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

use keepfresh_core::{Digest, FreshnessError, FreshnessResult, UserId, UserRecord};

/// Which users a sweep should cover.
#[derive(Debug, Clone, Default)]
pub enum UserSelection {
    /// Every user the host's store can enumerate.
    #[default]
    All,
    /// A single user.
    One(UserRecord),
    /// An explicit list of users.
    Many(Vec<UserRecord>),
}

impl UserSelection {
    pub(crate) fn explicit(self) -> Option<Vec<UserRecord>> {
        match self {
            UserSelection::All => None,
            UserSelection::One(user) => Some(vec![user]),
            UserSelection::Many(users) => Some(users),
        }
    }
}

impl From<UserRecord> for UserSelection {
    fn from(user: UserRecord) -> Self {
        UserSelection::One(user)
    }
}

impl From<Vec<UserRecord>> for UserSelection {
    fn from(users: Vec<UserRecord>) -> Self {
        UserSelection::Many(users)
    }
}

impl From<Option<Vec<UserRecord>>> for UserSelection {
    fn from(users: Option<Vec<UserRecord>>) -> Self {
        users.map_or(UserSelection::All, UserSelection::Many)
    }
}

/// What happened to one user during a freshness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The stored digest already matched; nothing was delivered or persisted.
    AlreadyFresh,
    /// The asset was delivered and this digest persisted.
    Delivered(Digest),
}

/// Per-user results of a sweep.
///
/// Sweeps never abort on a single user's failure; every user appears in
/// exactly one of the three lists.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Users that received the current asset.
    pub delivered: Vec<UserId>,
    /// Users that already held the current digest.
    pub already_fresh: Vec<UserId>,
    /// Users whose delivery or persistence failed, with the reason.
    pub failed: Vec<(UserId, FreshnessError)>,
}

impl SweepReport {
    pub(crate) fn record(&mut self, user: UserId, outcome: FreshnessResult<RefreshOutcome>) {
        match outcome {
            Ok(RefreshOutcome::Delivered(_)) => self.delivered.push(user),
            Ok(RefreshOutcome::AlreadyFresh) => self.already_fresh.push(user),
            Err(e) => self.failed.push((user, e)),
        }
    }

    /// Returns the number of users the sweep covered.
    pub fn total(&self) -> usize {
        self.delivered.len() + self.already_fresh.len() + self.failed.len()
    }

    /// Returns `true` if no user failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the ids of the users that failed.
    pub fn failed_users(&self) -> impl Iterator<Item = &UserId> {
        self.failed.iter().map(|(user, _)| user)
    }
}

/// The result of a hot update.
#[derive(Debug)]
pub struct UpdateOutcome {
    /// Digest of the asset that was replaced.
    pub previous: Digest,
    /// Digest of the new asset.
    pub current: Digest,
    /// The follow-up sweep, present only in proactive mode. An `Err` means
    /// users could not be enumerated; the new asset is live regardless.
    pub sweep: Option<FreshnessResult<SweepReport>>,
}

impl UpdateOutcome {
    /// Returns `true` if the new asset differs from the one it replaced.
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepfresh_core::StoreError;

    #[test]
    fn test_selection_normalizes_to_list() {
        let one: UserSelection = UserRecord::new("ted").into();
        assert_eq!(one.explicit().map(|users| users.len()), Some(1));

        let none: UserSelection = None.into();
        assert!(none.explicit().is_none());

        let many: UserSelection = vec![UserRecord::new("a"), UserRecord::new("b")].into();
        assert_eq!(many.explicit().map(|users| users.len()), Some(2));
    }

    #[test]
    fn test_report_buckets_outcomes() {
        let digest = keepfresh_core::digest(&serde_json::json!([])).unwrap();
        let mut report = SweepReport::default();
        report.record(UserId::from("a"), Ok(RefreshOutcome::Delivered(digest)));
        report.record(UserId::from("b"), Ok(RefreshOutcome::AlreadyFresh));
        report.record(
            UserId::from("c"),
            Err(FreshnessError::Persistence {
                user: UserId::from("c"),
                source: StoreError::Backend("down".to_string()),
            }),
        );

        assert_eq!(report.total(), 3);
        assert!(!report.is_success());
        assert_eq!(
            report.failed_users().collect::<Vec<_>>(),
            vec![&UserId::from("c")]
        );
    }
}
