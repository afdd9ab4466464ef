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

//! # KeepFresh Core
//!
//! Foundational crate containing the types and interface contracts shared by
//! every freshness tracker: content-addressed asset digests, the per-user
//! freshness bookkeeping persisted on user records, and the capabilities a
//! host must offer (user storage and inbound event delivery).
//!
//! Nothing in this crate knows how an asset reaches a user. That decision is
//! left to the delivery callback configured on the engine.

#![warn(missing_docs)]

pub mod asset;
pub mod error;
pub mod event;
pub mod host;
pub mod user;

pub use asset::{digest, Asset, Digest};
pub use error::{FreshnessError, FreshnessResult, StoreError, StoreResult};
pub use event::EventBus;
pub use host::{HandlerRegistration, Host, ReceiveEvent, ReceiveHandler};
pub use user::{FreshnessRecord, TrackerId, UserId, UserRecord, UserStore, STORAGE_KEY};
