//! Event fan-out over a broadcast channel.

use credgate_core::Event;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Publishes committed state transitions to any number of subscribers.
///
/// A subscriber that falls more than `capacity` events behind skips ahead
/// and sees `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: Event) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            tracing::trace!(event = name, "no event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credgate_core::Principal;

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        let first = Event::RewardIssued {
            owner: Principal::from_name("alice"),
            amount: 10,
        };
        let second = Event::RewardIssued {
            owner: Principal::from_name("bob"),
            amount: 10,
        };
        bus.emit(first.clone());
        bus.emit(second.clone());

        assert_eq!(rx.recv().await.unwrap(), first);
        assert_eq!(rx.recv().await.unwrap(), second);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(0);
        bus.emit(Event::RewardIssued {
            owner: Principal::from_name("alice"),
            amount: 1,
        });
    }
}
