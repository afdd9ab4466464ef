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

//! Error types shared by the freshness trackers and their hosts.

use crate::user::{TrackerId, UserId};
use thiserror::Error;

/// A specialized `Result` type for freshness operations.
pub type FreshnessResult<T> = Result<T, FreshnessError>;

/// A specialized `Result` type for user store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// An error that can occur while tracking or enforcing asset freshness.
///
/// `Configuration` and `Serialization` are fatal to the operation that raised
/// them and never leave partial state behind. `Delivery` and `Persistence` are
/// scoped to a single user.
#[derive(Debug, Error)]
pub enum FreshnessError {
    /// A required option is missing or malformed.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The asset could not be serialized for hashing.
    #[error("asset is not serializable: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The delivery callback failed for a user.
    #[error("delivery to user \"{user}\" failed: {source}")]
    Delivery {
        /// The user the asset was being delivered to.
        user: UserId,
        /// The error reported by the delivery callback.
        #[source]
        source: anyhow::Error,
    },

    /// The host failed to read or persist a user record.
    #[error("persisting user \"{user}\" failed: {source}")]
    Persistence {
        /// The user whose record could not be read or written.
        user: UserId,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// The host failed to enumerate its users for a sweep.
    #[error("listing users failed: {0}")]
    Enumeration(#[source] StoreError),

    /// The tracker was uninstalled before the operation could run.
    #[error("tracker \"{tracker}\" has been uninstalled")]
    Uninstalled {
        /// The tracker that was torn down.
        tracker: TrackerId,
    },
}

impl FreshnessError {
    /// Returns the user this error is scoped to, if any.
    pub fn user(&self) -> Option<&UserId> {
        match self {
            FreshnessError::Delivery { user, .. } | FreshnessError::Persistence { user, .. } => {
                Some(user)
            }
            _ => None,
        }
    }
}

/// An error originating from a host's user store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The requested user does not exist in the store.
    #[error("user \"{0}\" not found")]
    NotFound(UserId),

    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_reports_user() {
        let err = FreshnessError::Delivery {
            user: UserId::from("ted"),
            source: anyhow::anyhow!("socket closed"),
        };
        assert_eq!(err.user(), Some(&UserId::from("ted")));
        assert_eq!(
            err.to_string(),
            "delivery to user \"ted\" failed: socket closed"
        );
    }

    #[test]
    fn test_configuration_error_has_no_user() {
        let err = FreshnessError::Configuration("missing id".to_string());
        assert!(err.user().is_none());
    }

    #[test]
    fn test_persistence_error_chains_store_error() {
        let err = FreshnessError::Persistence {
            user: UserId::from("ann"),
            source: StoreError::Backend("disk full".to_string()),
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("storage backend error: disk full"));
    }
}
