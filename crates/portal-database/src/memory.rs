//! In-memory notification store used when no database is configured.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use portal_core::result::AppResult;
use portal_core::traits::{
    NewNotification, NotificationCounts, NotificationRecord, NotificationStore,
};

/// Process-local notification store keyed by user.
///
/// Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    by_user: DashMap<String, Vec<NotificationRecord>>,
}

impl MemoryNotificationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records stored for a user, oldest first.
    pub fn records_for(&self, user_id: &str) -> Vec<NotificationRecord> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn count_for_user(&self, user_id: &str) -> AppResult<NotificationCounts> {
        let counts = self
            .by_user
            .get(user_id)
            .map(|records| NotificationCounts {
                total: records.len() as u64,
                unread: records.iter().filter(|r| !r.is_read).count() as u64,
            })
            .unwrap_or_default();
        Ok(counts)
    }

    async fn create(
        &self,
        user_id: &str,
        notification: NewNotification,
    ) -> AppResult<NotificationRecord> {
        let record = NotificationRecord {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            title: notification.title,
            message: notification.message,
            category: notification.category,
            payload: notification.payload,
            is_read: false,
            created_at: Utc::now(),
        };
        self.by_user
            .entry(user_id.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn mark_read(&self, user_id: &str, notification_id: Uuid) -> AppResult<bool> {
        let Some(mut records) = self.by_user.get_mut(user_id) else {
            return Ok(false);
        };
        match records.iter_mut().find(|r| r.id == notification_id) {
            Some(record) => {
                record.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
