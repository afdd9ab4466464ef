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

//! The capability contract a host must satisfy for trackers to attach to it.
//!
//! A host is whatever owns the users and receives their messages: a bot
//! runtime, a chat server, a sync service. Trackers need exactly two things
//! from it: access to the [`UserStore`], and a way to register a
//! [`ReceiveHandler`] that is invoked for every inbound event carrying a user.

use crate::error::FreshnessResult;
use crate::user::{UserRecord, UserStore};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

/// An inbound, message-like event carrying the user it came from.
#[derive(Debug, Clone)]
pub struct ReceiveEvent {
    /// The user the event belongs to.
    pub user: UserRecord,
    /// The message payload, if the host exposes one.
    pub message: Option<Value>,
}

impl ReceiveEvent {
    /// Creates an event with no payload.
    pub fn new(user: UserRecord) -> Self {
        Self {
            user,
            message: None,
        }
    }

    /// Attaches a message payload.
    pub fn with_message(mut self, message: Value) -> Self {
        self.message = Some(message);
        self
    }
}

/// A callback invoked by the host for each inbound event.
#[async_trait]
pub trait ReceiveHandler: Send + Sync {
    /// Processes one event. Errors are surfaced to the host, which decides
    /// whether to log or retry.
    async fn on_receive(&self, event: &ReceiveEvent) -> FreshnessResult<()>;
}

/// The host capabilities a tracker attaches to.
pub trait Host: Send + Sync + 'static {
    /// Returns the host's user store.
    fn users(&self) -> Arc<dyn UserStore>;

    /// Registers a handler for inbound events.
    ///
    /// The returned registration removes the handler when
    /// [`remove`](HandlerRegistration::remove) is called; dropping it leaves
    /// the handler installed.
    fn add_receive_handler(&self, handler: Arc<dyn ReceiveHandler>) -> HandlerRegistration;
}

type RemoveFn = Box<dyn FnOnce() + Send>;

/// Deregisters a receive handler from its host. Removal runs at most once.
pub struct HandlerRegistration {
    remove: Mutex<Option<RemoveFn>>,
}

impl HandlerRegistration {
    /// Wraps the host-specific removal logic.
    pub fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Mutex::new(Some(Box::new(remove))),
        }
    }

    /// Removes the handler from the host.
    ///
    /// Returns `true` if this call performed the removal, `false` if it had
    /// already happened.
    pub fn remove(&self) -> bool {
        let remove = self
            .remove
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match remove {
            Some(remove) => {
                remove();
                true
            }
            None => false,
        }
    }

    /// Returns `true` while the handler is still registered.
    pub fn is_active(&self) -> bool {
        self.remove
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl std::fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("active", &self.is_active())
            .finish()
    }
}
