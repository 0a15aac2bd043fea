//! User-facing notification channel.
//!
//! Reconciliation housekeeping stays silent; only genuinely actionable
//! failures (a settings write that will not stick, a migration that
//! gave up) are published here for the UI to surface as non-blocking
//! toasts. Backed by a `tokio::sync::broadcast` channel so any number
//! of subscribers can listen independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A transient, non-blocking message for the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNotification {
    pub level: NotificationLevel,
    pub message: String,
    /// When the notification was created (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Fan-out hub for [`UserNotification`]s. Cheap to clone.
#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<UserNotification>,
}

impl NotificationBus {
    /// Create a bus with a specific channel capacity. When the buffer
    /// is full the oldest un-consumed messages are dropped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<UserNotification> {
        self.sender.subscribe()
    }

    /// Publish a notification to all current subscribers.
    ///
    /// If there are no active subscribers the message is silently
    /// dropped — notifications are advisory, never load-bearing.
    pub fn publish(&self, level: NotificationLevel, message: impl Into<String>) {
        let _ = self.sender.send(UserNotification {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NotificationLevel::Error, message);
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_messages() {
        let bus = NotificationBus::default();
        let mut rx = bus.subscribe();
        bus.error("write failed");
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.level, NotificationLevel::Error);
        assert_eq!(msg.message, "write failed");
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_silent() {
        let bus = NotificationBus::default();
        bus.warn("nobody listening");
    }

    #[tokio::test]
    async fn clones_share_the_channel() {
        let bus = NotificationBus::default();
        let mut rx = bus.subscribe();
        bus.clone().warn("from a clone");
        assert_eq!(rx.recv().await.unwrap().level, NotificationLevel::Warning);
    }
}
