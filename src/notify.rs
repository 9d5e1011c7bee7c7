use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::limits::MAX_INBOX_NOTIFICATIONS;
use crate::model::{BookingId, Ms, UserId};
use crate::observability;

pub type NotificationId = Ulid;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    BookingRequested,
    BookingConfirmed,
    BookingDeclined,
    BookingCancelled,
    /// Doubles as the "please rate your session" prompt.
    SessionCompleted,
}

/// Owned by the recipient: they read it, mark it, delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: Ms,
    pub booking_id: Option<BookingId>,
}

/// Per-user inbox plus a live broadcast channel, fed by booking
/// transitions. Delivery is best-effort by contract: nothing in here can
/// fail a booking mutation that already committed.
pub struct NotificationHub {
    inboxes: DashMap<UserId, Vec<Notification>>,
    channels: DashMap<UserId, broadcast::Sender<Notification>>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            inboxes: DashMap::new(),
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a user's live notifications. Creates the channel if needed.
    pub fn subscribe(&self, user_id: UserId) -> broadcast::Receiver<Notification> {
        let sender = self
            .channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Record and broadcast a notification. Send without subscribers is a
    /// no-op; inbox overflow drops the oldest entries.
    pub fn push(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        title: &str,
        message: String,
        booking_id: Option<BookingId>,
    ) -> NotificationId {
        let notification = Notification {
            id: Ulid::new(),
            user_id,
            kind,
            title: title.to_string(),
            message,
            read: false,
            created_at: now_ms(),
            booking_id,
        };
        debug!(
            payload = %serde_json::to_string(&notification).unwrap_or_default(),
            "notification"
        );

        let mut inbox = self.inboxes.entry(user_id).or_default();
        inbox.push(notification.clone());
        if inbox.len() > MAX_INBOX_NOTIFICATIONS {
            let excess = inbox.len() - MAX_INBOX_NOTIFICATIONS;
            inbox.drain(..excess);
            metrics::counter!(observability::NOTIFICATIONS_DROPPED_TOTAL).increment(excess as u64);
            warn!("inbox for {user_id} over cap, dropped {excess} oldest");
        }
        drop(inbox);

        if let Some(sender) = self.channels.get(&user_id) {
            let _ = sender.send(notification.clone());
        }
        notification.id
    }

    /// The recipient's inbox, oldest first.
    pub fn list(&self, user_id: UserId) -> Vec<Notification> {
        self.inboxes
            .get(&user_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn unread_count(&self, user_id: UserId) -> usize {
        self.inboxes
            .get(&user_id)
            .map(|e| e.value().iter().filter(|n| !n.read).count())
            .unwrap_or(0)
    }

    /// Returns false when the notification is not in this user's inbox.
    pub fn mark_read(&self, user_id: UserId, notification_id: NotificationId) -> bool {
        if let Some(mut inbox) = self.inboxes.get_mut(&user_id)
            && let Some(n) = inbox.iter_mut().find(|n| n.id == notification_id)
        {
            n.read = true;
            return true;
        }
        false
    }

    /// Recipient-side deletion. Returns false when nothing was deleted.
    pub fn delete(&self, user_id: UserId, notification_id: NotificationId) -> bool {
        if let Some(mut inbox) = self.inboxes.get_mut(&user_id)
            && let Some(pos) = inbox.iter().position(|n| n.id == notification_id)
        {
            inbox.remove(pos);
            return true;
        }
        false
    }
}

fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}
