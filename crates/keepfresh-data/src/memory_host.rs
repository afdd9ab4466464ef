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

//! A host that keeps its users and receive handlers in process.

use crate::memory_store::InMemoryUserStore;
use keepfresh_core::{
    FreshnessResult, HandlerRegistration, Host, ReceiveEvent, ReceiveHandler, UserStore,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

type HandlerList = Vec<(u64, Arc<dyn ReceiveHandler>)>;

/// An in-process [`Host`].
///
/// Events can be fed in two ways:
/// - [`receive`](Self::receive) runs every handler for one event, in
///   registration order, and returns the first error.
/// - [`dispatch`](Self::dispatch) drains a channel and processes events
///   concurrently, one task per event, logging failures.
pub struct InMemoryHost {
    users: Arc<InMemoryUserStore>,
    handlers: Arc<RwLock<HandlerList>>,
    next_handler_id: AtomicU64,
}

/// Counters returned by [`InMemoryHost::dispatch`] once its channel closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events taken off the channel.
    pub received: usize,
    /// Events for which at least one handler failed.
    pub failed: usize,
}

impl InMemoryHost {
    /// Creates a host with an empty user store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryUserStore::new()))
    }

    /// Creates a host backed by an existing store.
    pub fn with_store(users: Arc<InMemoryUserStore>) -> Self {
        Self {
            users,
            handlers: Arc::new(RwLock::new(Vec::new())),
            next_handler_id: AtomicU64::new(0),
        }
    }

    /// Returns the concrete store, for seeding and inspection.
    pub fn store(&self) -> &Arc<InMemoryUserStore> {
        &self.users
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivers one event to every registered handler, in order.
    ///
    /// Handlers registered or removed while the event is being processed do
    /// not affect it.
    ///
    /// # Errors
    /// Stops at, and returns, the first handler error.
    pub async fn receive(&self, event: ReceiveEvent) -> FreshnessResult<()> {
        for handler in self.snapshot_handlers() {
            handler.on_receive(&event).await?;
        }
        Ok(())
    }

    /// Dispatches events from `events` until every sender is dropped.
    ///
    /// Each event is processed on its own task, so events for different users
    /// proceed in parallel. Returns once all spawned tasks have finished.
    pub async fn dispatch(
        self: Arc<Self>,
        events: flume::Receiver<ReceiveEvent>,
    ) -> DispatchStats {
        let mut stats = DispatchStats::default();
        let mut tasks = Vec::new();

        while let Ok(event) = events.recv_async().await {
            stats.received += 1;
            let host = Arc::clone(&self);
            tasks.push(tokio::spawn(async move {
                let user = event.user.id.clone();
                match host.receive(event).await {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("Handler failed for user \"{user}\": {e}");
                        false
                    }
                }
            }));
        }

        for task in tasks {
            match task.await {
                Ok(true) => {}
                Ok(false) => stats.failed += 1,
                Err(e) => {
                    log::error!("Dispatch task panicked: {e}");
                    stats.failed += 1;
                }
            }
        }

        log::debug!(
            "Dispatch finished: {} event(s), {} failure(s).",
            stats.received,
            stats.failed
        );
        stats
    }

    fn snapshot_handlers(&self) -> Vec<Arc<dyn ReceiveHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for InMemoryHost {
    fn users(&self) -> Arc<dyn UserStore> {
        self.users.clone()
    }

    fn add_receive_handler(&self, handler: Arc<dyn ReceiveHandler>) -> HandlerRegistration {
        let id = self.next_handler_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handler));
        log::trace!("Registered receive handler #{id}.");

        let handlers = Arc::clone(&self.handlers);
        HandlerRegistration::new(move || {
            handlers
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(registered, _)| *registered != id);
            log::trace!("Removed receive handler #{id}.");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keepfresh_core::{FreshnessError, StoreError, UserId, UserRecord};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReceiveHandler for CountingHandler {
        async fn on_receive(&self, _event: &ReceiveEvent) -> FreshnessResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl ReceiveHandler for FailingHandler {
        async fn on_receive(&self, event: &ReceiveEvent) -> FreshnessResult<()> {
            Err(FreshnessError::Persistence {
                user: event.user.id.clone(),
                source: StoreError::Backend("offline".to_string()),
            })
        }
    }

    fn event() -> ReceiveEvent {
        ReceiveEvent::new(UserRecord::new("ted"))
    }

    #[tokio::test]
    async fn test_receive_runs_every_handler() {
        let host = InMemoryHost::new();
        let first = Arc::new(CountingHandler::default());
        let second = Arc::new(CountingHandler::default());
        host.add_receive_handler(first.clone());
        host.add_receive_handler(second.clone());

        host.receive(event()).await.unwrap();
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_removed_handler_is_not_called() {
        let host = InMemoryHost::new();
        let handler = Arc::new(CountingHandler::default());
        let registration = host.add_receive_handler(handler.clone());
        assert_eq!(host.handler_count(), 1);

        assert!(registration.remove());
        assert!(!registration.remove());
        assert_eq!(host.handler_count(), 0);

        host.receive(event()).await.unwrap();
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_receive_stops_at_first_error() {
        let host = InMemoryHost::new();
        let after = Arc::new(CountingHandler::default());
        host.add_receive_handler(Arc::new(FailingHandler));
        host.add_receive_handler(after.clone());

        let err = host.receive(event()).await.unwrap_err();
        assert_eq!(err.user(), Some(&UserId::from("ted")));
        assert_eq!(after.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_drains_channel() {
        let host = Arc::new(InMemoryHost::new());
        let handler = Arc::new(CountingHandler::default());
        host.add_receive_handler(handler.clone());

        let (sender, receiver) = flume::unbounded();
        for _ in 0..5 {
            sender.send(event()).unwrap();
        }
        drop(sender);

        let stats = Arc::clone(&host).dispatch(receiver).await;
        assert_eq!(stats, DispatchStats { received: 5, failed: 0 });
        assert_eq!(handler.calls.load(Ordering::SeqCst), 5);
    }
}
