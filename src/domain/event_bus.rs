//! Best-effort change notifier.
//!
//! [`Notifier`] is the seam the services publish through; [`EventBus`] is
//! the in-process implementation backed by a [`tokio::sync::broadcast`]
//! channel. WebSocket connections subscribe to the bus and filter by event
//! id on their side.

use std::fmt::Debug;

use tokio::sync::broadcast;

use super::VoteNotification;

/// Fire-and-forget publisher of [`VoteNotification`]s.
///
/// Implementations must never block or fail the caller. Delivery is
/// at-most-once with no persistence or retry.
pub trait Notifier: Send + Sync + Debug {
    /// Publishes a notification, returning how many subscribers got it.
    fn publish(&self, notification: VoteNotification) -> usize;
}

/// Broadcast bus for [`VoteNotification`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// When the ring buffer is full, the oldest notifications are dropped for
/// lagging receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<VoteNotification>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Creates a new receiver that will receive all future notifications.
    ///
    /// Each WebSocket connection should call this once on connect.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<VoteNotification> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Notifier for EventBus {
    /// If there are no active receivers, the notification is silently
    /// dropped and `0` is returned.
    fn publish(&self, notification: VoteNotification) -> usize {
        self.sender.send(notification).unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::EventId;
    use chrono::Utc;

    fn make_notification(event_id: EventId) -> VoteNotification {
        VoteNotification::VoteCast {
            event_id,
            team_name: "A".to_string(),
            total_votes: 1,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(make_notification(EventId::new())), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_notification() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let id = EventId::new();
        bus.publish(make_notification(id));

        let Ok(received) = rx.recv().await else {
            panic!("expected to receive notification");
        };
        assert_eq!(received.event_id(), id);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_same_notification() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let id = EventId::new();
        assert_eq!(bus.publish(make_notification(id)), 2);

        let (Ok(n1), Ok(n2)) = (rx1.recv().await, rx2.recv().await) else {
            panic!("both receivers must get the notification");
        };
        assert_eq!(n1.event_id(), n2.event_id());
    }

    #[tokio::test]
    async fn lagging_receiver_skips_oldest() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..5 {
            bus.publish(make_notification(EventId::new()));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = EventBus::new(16);
        assert_eq!(bus.receiver_count(), 0);

        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }
}
