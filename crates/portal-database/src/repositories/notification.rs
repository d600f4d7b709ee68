//! Notification repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use portal_core::error::{AppError, ErrorKind};
use portal_core::result::AppResult;
use portal_core::traits::{
    NewNotification, NotificationCounts, NotificationRecord, NotificationStore,
};

/// Row shape of the `notifications` table.
#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: String,
    title: String,
    message: Option<String>,
    category: Option<String>,
    payload: serde_json::Value,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for NotificationRecord {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            category: row.category,
            payload: row.payload,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed notification store.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn count_for_user(&self, user_id: &str) -> AppResult<NotificationCounts> {
        let (total, unread): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_read = FALSE) \
             FROM notifications WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count notifications", e)
        })?;

        Ok(NotificationCounts {
            total: total.max(0) as u64,
            unread: unread.max(0) as u64,
        })
    }

    async fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count unread", e))?;
        Ok(count.max(0) as u64)
    }

    async fn create(
        &self,
        user_id: &str,
        notification: NewNotification,
    ) -> AppResult<NotificationRecord> {
        sqlx::query_as::<_, NotificationRow>(
            "INSERT INTO notifications (id, user_id, title, message, category, payload) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, user_id, title, message, category, payload, is_read, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.category)
        .bind(&notification.payload)
        .fetch_one(&self.pool)
        .await
        .map(NotificationRecord::from)
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create notification", e)
        })
    }

    async fn mark_read(&self, user_id: &str, notification_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;
        Ok(result.rows_affected() > 0)
    }
}
