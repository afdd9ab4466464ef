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

use std::sync::Arc;

use keepfresh_core::{
    Asset, Digest, FreshnessResult, HandlerRegistration, ReceiveEvent, TrackerId,
};
use serde::Serialize;

use super::agent::EngineCore;
use super::report::{RefreshOutcome, SweepReport, UpdateOutcome, UserSelection};
use super::state::{AssetSnapshot, EngineState};

/// The control surface of an installed tracker.
///
/// Cheap to clone; every clone drives the same engine.
#[derive(Clone)]
pub struct FreshnessHandle {
    core: Arc<EngineCore>,
    registration: Arc<HandlerRegistration>,
}

impl FreshnessHandle {
    pub(crate) fn new(core: Arc<EngineCore>, registration: HandlerRegistration) -> Self {
        Self {
            core,
            registration: Arc::new(registration),
        }
    }

    /// Returns the tracker id.
    pub fn tracker(&self) -> &TrackerId {
        &self.core.tracker
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.core.current_state()
    }

    /// Waits for initialization, including the install-time sweep in
    /// proactive mode, and returns that sweep's report.
    ///
    /// The report is empty when the tracker is not proactive.
    ///
    /// # Errors
    /// Returns [`FreshnessError::Uninstalled`](keepfresh_core::FreshnessError::Uninstalled)
    /// if the tracker was torn down before it became ready.
    pub async fn ready(&self) -> FreshnessResult<Arc<SweepReport>> {
        self.core.wait_until_ready().await?;
        Ok(self.core.init_report.get().cloned().unwrap_or_default())
    }

    /// Returns the digest of the current asset.
    pub async fn digest(&self) -> Digest {
        self.core.snapshot().await.digest.clone()
    }

    /// Returns the current asset.
    pub async fn asset(&self) -> Arc<Asset> {
        Arc::clone(&self.core.snapshot().await.asset)
    }

    /// Hot-swaps the tracked asset.
    ///
    /// Unless `force` is set, the swap waits for initialization to finish so
    /// it can never be overtaken by install-time work. The asset and its
    /// digest are replaced together. In proactive mode every user is swept
    /// afterwards.
    ///
    /// Once the swap has happened the call succeeds; a failed follow-up sweep
    /// is carried in [`UpdateOutcome::sweep`].
    ///
    /// # Errors
    /// Returns `Serialization` or `Configuration` errors for an asset that
    /// cannot be hashed or is not an object or array, leaving the current
    /// asset untouched, and `Uninstalled` if the tracker was torn down first.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        item: &T,
        force: bool,
    ) -> FreshnessResult<UpdateOutcome> {
        self.core.ensure_installed()?;
        if !force {
            self.core.wait_until_ready().await?;
        }

        let next = AssetSnapshot::new(Asset::from_serialize(item)?)?;
        let current = next.digest.clone();
        let previous = self.core.swap(next).await.digest.clone();
        log::info!(
            "Tracker \"{}\" updated: {previous} -> {current}.",
            self.core.tracker
        );

        let sweep = if self.core.proactive {
            let sweep = self.core.sweep(UserSelection::All).await;
            if let Err(e) = &sweep {
                log::error!(
                    "Sweep after updating \"{}\" failed: {e}",
                    self.core.tracker
                );
            }
            Some(sweep)
        } else {
            None
        };

        Ok(UpdateOutcome {
            previous,
            current,
            sweep,
        })
    }

    /// Brings the selected users up to date, concurrently.
    ///
    /// Pass [`UserSelection::All`] (or `None`) to cover every user the host
    /// knows, or a single record or list of records. The call returns once
    /// every user has settled; one user's failure never stops the others.
    ///
    /// # Errors
    /// Returns `Enumeration` if the host cannot list its users, and
    /// `Uninstalled` after teardown.
    pub async fn ensure_fresh(
        &self,
        users: impl Into<UserSelection>,
    ) -> FreshnessResult<SweepReport> {
        self.core.ensure_installed()?;
        self.core.sweep(users.into()).await
    }

    /// Runs the per-event freshness check for one event.
    ///
    /// This is what the host calls for each inbound event; it is exposed for
    /// hosts that prefer to drive trackers directly.
    pub async fn handle_event(&self, event: &ReceiveEvent) -> FreshnessResult<RefreshOutcome> {
        self.core.ensure_installed()?;
        self.core.refresh_user(event.user.clone()).await
    }

    /// Removes the receive handler from the host.
    ///
    /// Idempotent. Work already in flight runs to completion; new calls on
    /// this handle fail with `Uninstalled`. Returns `true` for the call that
    /// actually performed the teardown.
    pub fn uninstall(&self) -> bool {
        let removed = self.registration.remove();
        let previous = self.core.state.send_replace(EngineState::Uninstalled);
        if previous != EngineState::Uninstalled {
            log::info!("Tracker \"{}\" uninstalled.", self.core.tracker);
        }
        removed
    }
}

impl std::fmt::Debug for FreshnessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreshnessHandle")
            .field("tracker", &self.core.tracker)
            .field("state", &self.state())
            .field("registration", &self.registration)
            .finish()
    }
}
