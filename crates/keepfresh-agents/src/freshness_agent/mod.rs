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

//! Keeps users up to date with an asset, delivering it only when stale.
//!
//! A [`FreshnessEngine`] owns one asset and its digest. Once installed on a
//! host it checks the sender of every inbound event: if the digest stored on
//! the user's record for this tracker differs from the current one (or is
//! missing), the delivery callback runs and the new digest is persisted.
//! Otherwise nothing happens, which makes repeated checks cheap and
//! idempotent.
//!
//! Through the [`FreshnessHandle`] returned by `install`, the asset can be
//! hot-swapped and users can be synced in bulk. In proactive mode both
//! installation and every hot update sweep all known users.
//!
//! Delivery is at-least-once: a user whose delivery or persistence fails
//! stays stale and is retried on their next event.

mod agent;
mod handle;
mod locks;
mod options;
mod report;
mod state;

pub use agent::FreshnessEngine;
pub use handle::FreshnessHandle;
pub use options::{Delivery, DeliveryContext, FreshnessOptions, TrackerSettings};
pub use report::{RefreshOutcome, SweepReport, UpdateOutcome, UserSelection};
pub use state::EngineState;
