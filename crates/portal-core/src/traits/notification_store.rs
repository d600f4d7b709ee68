//! Narrow read/write interface to the persisted-notification store.
//!
//! The push core never owns notification content. It reads unread counts
//! for the `stats` frame and the statistics endpoint, and application code
//! writes records through the same interface before asking the dispatcher
//! to push them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::AppResult;

/// Per-user notification counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCounts {
    /// All stored notifications for the user.
    pub total: u64,
    /// Notifications not yet marked as read.
    pub unread: u64,
}

/// Input for creating a persisted notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    /// Short title shown in the portal header.
    pub title: String,
    /// Optional body text.
    pub message: Option<String>,
    /// Application category (`event`, `resource`, `announcement`, ...).
    pub category: Option<String>,
    /// Application-defined payload pushed to clients unchanged.
    pub payload: serde_json::Value,
}

/// A stored notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Notification ID.
    pub id: Uuid,
    /// Owning principal.
    pub user_id: String,
    /// Title.
    pub title: String,
    /// Body text.
    pub message: Option<String>,
    /// Category.
    pub category: Option<String>,
    /// Payload.
    pub payload: serde_json::Value,
    /// Whether the user has read it.
    pub is_read: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Persisted-notification store consumed by the push core.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Total and unread counts for a user.
    async fn count_for_user(&self, user_id: &str) -> AppResult<NotificationCounts>;

    /// Unread count for a user.
    async fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        Ok(self.count_for_user(user_id).await?.unread)
    }

    /// Persist a notification for a user.
    async fn create(
        &self,
        user_id: &str,
        notification: NewNotification,
    ) -> AppResult<NotificationRecord>;

    /// Mark a notification as read. Returns `false` if it does not exist
    /// or belongs to another user.
    async fn mark_read(&self, user_id: &str, notification_id: Uuid) -> AppResult<bool>;
}
