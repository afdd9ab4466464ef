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

//! The freshness engine: per-user staleness checks, delivery and bookkeeping.

use std::sync::Arc;

use async_trait::async_trait;
use keepfresh_core::user::freshness_patch;
use keepfresh_core::{
    Asset, FreshnessError, FreshnessResult, Host, ReceiveEvent, ReceiveHandler, TrackerId,
    UserRecord,
};
use tokio::sync::{watch, OnceCell, RwLock};

use super::handle::FreshnessHandle;
use super::locks::UserLocks;
use super::options::{Delivery, DeliveryContext, FreshnessOptions};
use super::report::{RefreshOutcome, SweepReport, UserSelection};
use super::state::{AssetSnapshot, EngineState};

/// A configured, not yet installed freshness tracker.
///
/// Building the engine validates the configuration; [`install`](Self::install)
/// binds it to a host and returns the [`FreshnessHandle`] used from then on.
///
/// # Examples
///
/// ```no_run
/// use keepfresh_agents::{DeliveryContext, FreshnessEngine, FreshnessOptions};
/// use serde_json::json;
///
/// let engine = FreshnessEngine::new(
///     FreshnessOptions::new("models", json!([{ "id": "a" }, { "id": "b" }])),
///     |ctx: DeliveryContext| async move {
///         println!("sending {} to {}", ctx.digest, ctx.user.id);
///         anyhow::Ok(())
///     },
/// )
/// .unwrap();
/// ```
pub struct FreshnessEngine {
    tracker: TrackerId,
    item: Asset,
    proactive: bool,
    delivery: Arc<dyn Delivery>,
}

impl FreshnessEngine {
    /// Validates `options` and pairs them with a delivery callback.
    ///
    /// # Errors
    /// Returns [`FreshnessError::Configuration`] if the id is blank or the
    /// item is neither an object nor an array.
    pub fn new(options: FreshnessOptions, delivery: impl Delivery) -> FreshnessResult<Self> {
        let FreshnessOptions {
            id,
            item,
            proactive,
        } = options;

        if id.trim().is_empty() {
            return Err(FreshnessError::Configuration(
                "tracker id must not be empty".to_string(),
            ));
        }
        let item = Asset::new(item)?;

        Ok(Self {
            tracker: TrackerId::new(id),
            item,
            proactive,
            delivery: Arc::new(delivery),
        })
    }

    /// Returns the tracker id.
    pub fn tracker(&self) -> &TrackerId {
        &self.tracker
    }

    /// Binds the engine to `host`.
    ///
    /// The initial digest is computed before anything else, so the receive
    /// handler registered here never sees an engine without one. The
    /// install-time sweep (proactive mode only) runs in the background;
    /// await [`FreshnessHandle::ready`] to know when it is done.
    ///
    /// # Errors
    /// Returns [`FreshnessError::Configuration`] when called outside a Tokio
    /// runtime, and [`FreshnessError::Serialization`] if the asset cannot be
    /// hashed. Nothing is registered with the host in either case.
    pub fn install(self, host: Arc<dyn Host>) -> FreshnessResult<FreshnessHandle> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            FreshnessError::Configuration(
                "trackers must be installed from within a Tokio runtime".to_string(),
            )
        })?;

        let snapshot = AssetSnapshot::new(self.item)?;
        log::info!(
            "Installing tracker \"{}\" at digest {} (proactive: {}).",
            self.tracker,
            snapshot.digest,
            self.proactive
        );

        let (state, _) = watch::channel(EngineState::Initializing);
        let core = Arc::new(EngineCore {
            tracker: self.tracker,
            proactive: self.proactive,
            delivery: self.delivery,
            host: Arc::clone(&host),
            current: RwLock::new(Arc::new(snapshot)),
            state,
            init_report: OnceCell::new(),
            locks: UserLocks::default(),
        });

        let registration = host.add_receive_handler(core.clone());

        let init = Arc::clone(&core);
        runtime.spawn(async move { init.initialize().await });

        Ok(FreshnessHandle::new(core, registration))
    }
}

/// State shared between the handle, the host's receive handler and spawned
/// sweep tasks.
pub(crate) struct EngineCore {
    pub tracker: TrackerId,
    pub proactive: bool,
    delivery: Arc<dyn Delivery>,
    pub host: Arc<dyn Host>,
    current: RwLock<Arc<AssetSnapshot>>,
    pub state: watch::Sender<EngineState>,
    pub init_report: OnceCell<Arc<SweepReport>>,
    pub locks: UserLocks,
}

impl EngineCore {
    async fn initialize(self: Arc<Self>) {
        let report = if self.proactive {
            // Own task, so a panicking host cannot keep the gate shut.
            let core = Arc::clone(&self);
            match tokio::spawn(async move { core.sweep(UserSelection::All).await }).await {
                Ok(Ok(report)) => report,
                Ok(Err(e)) => {
                    log::error!("Install-time sweep for \"{}\" failed: {e}", self.tracker);
                    SweepReport::default()
                }
                Err(e) => {
                    log::error!(
                        "Install-time sweep for \"{}\" did not complete: {e}",
                        self.tracker
                    );
                    SweepReport::default()
                }
            }
        } else {
            SweepReport::default()
        };

        let _ = self.init_report.set(Arc::new(report));
        let became_ready = self.state.send_if_modified(|state| {
            if *state == EngineState::Initializing {
                *state = EngineState::Ready;
                true
            } else {
                false
            }
        });
        if became_ready {
            log::info!("Tracker \"{}\" is ready.", self.tracker);
        }
    }

    pub fn current_state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn ensure_installed(&self) -> FreshnessResult<()> {
        match self.current_state() {
            EngineState::Uninstalled => Err(self.uninstalled()),
            _ => Ok(()),
        }
    }

    pub fn uninstalled(&self) -> FreshnessError {
        FreshnessError::Uninstalled {
            tracker: self.tracker.clone(),
        }
    }

    /// Waits until initialization has completed.
    pub async fn wait_until_ready(&self) -> FreshnessResult<()> {
        let mut state = self.state.subscribe();
        let settled = state
            .wait_for(|state| *state != EngineState::Initializing)
            .await
            .map(|state| *state)
            .map_err(|_| self.uninstalled())?;
        match settled {
            EngineState::Ready => Ok(()),
            _ => Err(self.uninstalled()),
        }
    }

    /// Returns the current asset/digest pair.
    pub async fn snapshot(&self) -> Arc<AssetSnapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replaces the current asset/digest pair and returns the previous one.
    pub async fn swap(&self, next: AssetSnapshot) -> Arc<AssetSnapshot> {
        let mut current = self.current.write().await;
        std::mem::replace(&mut *current, Arc::new(next))
    }

    /// Brings one user up to date.
    ///
    /// The whole check-deliver-persist sequence runs under the user's lock,
    /// and the user is re-read from the store once the lock is held, so a
    /// queued event for the same user sees the digest written by the one
    /// before it. The digest persisted is the one that was current when
    /// delivery started, never a later one.
    pub async fn refresh_user(&self, user: UserRecord) -> FreshnessResult<RefreshOutcome> {
        let _guard = self.locks.lock(&user.id).await;
        let snapshot = self.snapshot().await;
        let users = self.host.users();

        let stored = users
            .get(&user.id)
            .await
            .map_err(|source| FreshnessError::Persistence {
                user: user.id.clone(),
                source,
            })?;
        let known = stored.is_some();
        let user = stored.unwrap_or(user);

        if user.is_fresh(&self.tracker, &snapshot.digest) {
            log::trace!("User \"{}\" already has fresh \"{}\".", user.id, self.tracker);
            return Ok(RefreshOutcome::AlreadyFresh);
        }

        log::debug!("updating user \"{}\" with fresh \"{}\"", user.id, self.tracker);
        let context = DeliveryContext {
            host: Arc::clone(&self.host),
            user: user.clone(),
            asset: Arc::clone(&snapshot.asset),
            tracker: self.tracker.clone(),
            digest: snapshot.digest.clone(),
        };
        self.delivery
            .deliver(context)
            .await
            .map_err(|source| FreshnessError::Delivery {
                user: user.id.clone(),
                source,
            })?;

        let persisted = if known {
            users
                .merge(&user.id, freshness_patch(&self.tracker, &snapshot.digest))
                .await
                .map(|_| ())
        } else {
            let mut record = user.clone();
            record.record_delivery(&self.tracker, &snapshot.digest);
            users.save(&record).await
        };
        persisted.map_err(|source| FreshnessError::Persistence {
            user: user.id.clone(),
            source,
        })?;

        Ok(RefreshOutcome::Delivered(snapshot.digest.clone()))
    }

    /// Refreshes every selected user concurrently and reports each outcome.
    ///
    /// # Errors
    /// Only fails if the host cannot enumerate its users. Per-user failures
    /// are collected in the report.
    pub async fn sweep(self: &Arc<Self>, selection: UserSelection) -> FreshnessResult<SweepReport> {
        let users = match selection.explicit() {
            Some(users) => users,
            None => self
                .host
                .users()
                .list()
                .await
                .map_err(FreshnessError::Enumeration)?,
        };

        let tasks: Vec<_> = users
            .into_iter()
            .map(|user| {
                let id = user.id.clone();
                let core = Arc::clone(self);
                let task = tokio::spawn(async move { core.refresh_user(user).await });
                (id, task)
            })
            .collect();

        let mut report = SweepReport::default();
        for (user, task) in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(FreshnessError::Delivery {
                    user: user.clone(),
                    source: anyhow::anyhow!("refresh task did not complete: {e}"),
                }),
            };
            if let Err(e) = &outcome {
                log::warn!("Could not refresh \"{}\" for user \"{user}\": {e}", self.tracker);
            }
            report.record(user, outcome);
        }

        log::info!(
            "Sweep for \"{}\": {} delivered, {} already fresh, {} failed.",
            self.tracker,
            report.delivered.len(),
            report.already_fresh.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

#[async_trait]
impl ReceiveHandler for EngineCore {
    async fn on_receive(&self, event: &ReceiveEvent) -> FreshnessResult<()> {
        self.ensure_installed()?;
        self.refresh_user(event.user.clone()).await.map(|_| ())
    }
}
