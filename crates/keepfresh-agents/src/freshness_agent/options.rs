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

//! Configuration of a freshness tracker and its delivery callback.

use async_trait::async_trait;
use keepfresh_core::{Asset, Digest, Host, TrackerId, UserRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// The serializable part of a tracker's configuration.
///
/// # Examples
///
/// ```
/// use keepfresh_agents::TrackerSettings;
///
/// let settings: TrackerSettings =
///     serde_json::from_str(r#"{ "id": "models", "proactive": true }"#).unwrap();
/// assert!(settings.proactive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Names this freshness stream and its entry in user records.
    pub id: String,

    /// Whether to sync every known user on install and after each hot update.
    #[serde(default)]
    pub proactive: bool,
}

/// Everything needed to build a [`FreshnessEngine`](super::FreshnessEngine)
/// apart from the delivery callback.
#[derive(Debug, Clone, PartialEq)]
pub struct FreshnessOptions {
    /// Tracker id, e.g. `"models"` or `"colors"`.
    pub id: String,
    /// The initial asset. Must be a JSON object or array.
    pub item: Value,
    /// Eagerly sync all users on install and after every hot update.
    pub proactive: bool,
}

impl FreshnessOptions {
    /// Creates lazy (non-proactive) options.
    pub fn new(id: impl Into<String>, item: Value) -> Self {
        Self {
            id: id.into(),
            item,
            proactive: false,
        }
    }

    /// Builder-style setter for proactive mode.
    pub fn proactive(mut self, proactive: bool) -> Self {
        self.proactive = proactive;
        self
    }

    /// Combines deserialized settings with an asset value.
    pub fn from_settings(settings: TrackerSettings, item: Value) -> Self {
        Self {
            id: settings.id,
            item,
            proactive: settings.proactive,
        }
    }
}

/// What the delivery callback receives for one stale user.
#[derive(Clone)]
pub struct DeliveryContext {
    /// The host the tracker is installed on.
    pub host: Arc<dyn Host>,
    /// The user to deliver to, as last read from the store.
    pub user: UserRecord,
    /// The asset version to deliver.
    pub asset: Arc<Asset>,
    /// The tracker performing the delivery.
    pub tracker: TrackerId,
    /// The digest that will be recorded once delivery succeeds.
    pub digest: Digest,
}

impl std::fmt::Debug for DeliveryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryContext")
            .field("user", &self.user.id)
            .field("tracker", &self.tracker)
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}

/// Transmits the current asset to a stale user.
///
/// How the asset travels (a message, a push, an upload) is entirely up to
/// the implementation. Any async closure taking a [`DeliveryContext`] and
/// returning `anyhow::Result<()>` implements this trait.
///
/// Returning an error leaves the user stale: nothing is persisted and the
/// next event for that user retries the delivery.
#[async_trait]
pub trait Delivery: Send + Sync + 'static {
    /// Delivers `context.asset` to `context.user`.
    async fn deliver(&self, context: DeliveryContext) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> Delivery for F
where
    F: Fn(DeliveryContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn deliver(&self, context: DeliveryContext) -> anyhow::Result<()> {
        (self)(context).await
    }
}
