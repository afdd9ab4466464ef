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

/// A multi-producer, single-consumer channel of inbound events.
///
/// The bus keeps its own sender so it can publish directly; hand out extra
/// senders with [`sender`](Self::sender) to let transports publish from other
/// threads or tasks. A dispatcher consumes events through
/// [`receiver`](Self::receiver) and stops once every sender is gone.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: Option<flume::Sender<T>>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a bus backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("Event bus initialized.");
        Self {
            sender: Some(sender),
            receiver,
        }
    }

    /// Publishes an event.
    ///
    /// Returns `false` if the bus was closed or the receiving side is gone.
    pub fn publish(&self, event: T) -> bool {
        let Some(sender) = &self.sender else {
            log::warn!("Dropping event published on a closed bus.");
            return false;
        };
        match sender.send(event) {
            Ok(()) => {
                log::trace!("Published an event.");
                true
            }
            Err(e) => {
                log::error!("Failed to publish event: {e}. Receiver likely disconnected.");
                false
            }
        }
    }

    /// Returns a new sender for this bus, or `None` once the bus is closed.
    pub fn sender(&self) -> Option<flume::Sender<T>> {
        self.sender.clone()
    }

    /// Returns a handle to the receiving end, for the dispatcher.
    pub fn receiver(&self) -> flume::Receiver<T> {
        self.receiver.clone()
    }

    /// Drops the bus's own sender.
    ///
    /// Once every sender handed out by [`sender`](Self::sender) is dropped
    /// too, the receiver drains the remaining events and then disconnects.
    pub fn close(&mut self) {
        if self.sender.take().is_some() {
            log::debug!("Event bus closed.");
        }
    }

    /// Returns the number of events waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ReceiveEvent;
    use crate::user::{UserId, UserRecord};
    use flume::TryRecvError;
    use std::{thread, time::Duration};

    fn event_for(id: &str) -> ReceiveEvent {
        ReceiveEvent::new(UserRecord::new(id))
    }

    #[test]
    fn test_publish_and_receive_in_order() {
        let bus = EventBus::new();
        assert!(bus.publish(event_for("ted")));
        assert!(bus.publish(event_for("ann")));
        assert_eq!(bus.pending(), 2);

        let receiver = bus.receiver();
        let first = receiver.try_recv().expect("first event");
        let second = receiver.try_recv().expect("second event");
        assert_eq!(first.user.id, UserId::from("ted"));
        assert_eq!(second.user.id, UserId::from("ann"));
        assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_publish_from_thread() {
        let bus = EventBus::new();
        let sender = bus.sender().expect("bus is open");

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sender.send(event_for("ted")).expect("send from thread");
        });

        let received = bus
            .receiver()
            .recv_timeout(Duration::from_secs(1))
            .expect("event from thread");
        assert_eq!(received.user.id, UserId::from("ted"));
        handle.join().expect("thread join");
    }

    #[test]
    fn test_close_disconnects_after_drain() {
        let mut bus = EventBus::new();
        bus.publish(event_for("ted"));
        bus.close();

        assert!(!bus.publish(event_for("ann")));
        assert!(bus.sender().is_none());

        let receiver = bus.receiver();
        assert!(receiver.try_recv().is_ok());
        assert!(matches!(
            receiver.try_recv(),
            Err(TryRecvError::Disconnected)
        ));
    }
}
