//! Fire-and-forget notifications emitted after a booking or invitation
//! state change commits. Delivery failures are logged, never propagated —
//! they must not roll back or be conflated with the committed change.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::{BookingId, Ms, UserId};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    BookingCancelled {
        booking_id: BookingId,
        title: String,
        start: Ms,
        recipient: UserId,
    },
    InvitationReceived {
        booking_id: BookingId,
        title: String,
        start: Ms,
        recipient: UserId,
        owner: UserId,
    },
    InvitationAccepted {
        booking_id: BookingId,
        recipient: UserId,
        invitee: UserId,
    },
}

impl Notification {
    pub fn recipient(&self) -> UserId {
        match self {
            Notification::BookingCancelled { recipient, .. }
            | Notification::InvitationReceived { recipient, .. }
            | Notification::InvitationAccepted { recipient, .. } => *recipient,
        }
    }
}

#[derive(Debug)]
pub struct NotifyError(pub String);

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification delivery failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Outbound notification sender. The real implementation wraps an email or
/// push service at the edge; the engine never awaits delivery on the
/// request path.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Broadcast hub with one channel per recipient.
pub struct NotifyHub {
    channels: DashMap<UserId, broadcast::Sender<Notification>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a user's notifications. Creates the channel if needed.
    pub fn subscribe(&self, user_id: UserId) -> broadcast::Receiver<Notification> {
        let sender = self
            .channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send to a user's channel. No-op if nobody is listening.
    pub fn send(&self, user_id: UserId, notification: Notification) {
        if let Some(sender) = self.channels.get(&user_id) {
            let _ = sender.send(notification);
        }
    }

    /// Remove a user's channel.
    pub fn remove(&self, user_id: UserId) {
        self.channels.remove(&user_id);
    }
}

#[async_trait]
impl Notifier for NotifyHub {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        self.send(notification.recipient(), notification);
        Ok(())
    }
}

/// Sink that writes each notification as a JSON audit line.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        let payload =
            serde_json::to_string(&notification).map_err(|e| NotifyError(e.to_string()))?;
        tracing::info!(target: "roomkit::audit", recipient = notification.recipient(), %payload, "notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe(42);

        let n = Notification::InvitationAccepted {
            booking_id: 1,
            recipient: 42,
            invitee: 7,
        };
        hub.deliver(n.clone()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, n);
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        // No subscriber — should not panic or error
        hub.deliver(Notification::BookingCancelled {
            booking_id: 9,
            title: "Standup".into(),
            start: 0,
            recipient: 3,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn delivery_routed_per_recipient() {
        let hub = NotifyHub::new();
        let mut rx_a = hub.subscribe(1);
        let mut rx_b = hub.subscribe(2);

        hub.deliver(Notification::InvitationAccepted {
            booking_id: 5,
            recipient: 2,
            invitee: 1,
        })
        .await
        .unwrap();

        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.recv().await.is_ok());
    }

    #[tokio::test]
    async fn log_notifier_serializes() {
        LogNotifier
            .deliver(Notification::InvitationReceived {
                booking_id: 2,
                title: "Review".into(),
                start: 1_000,
                recipient: 4,
                owner: 1,
            })
            .await
            .unwrap();
    }
}
