//! Recording pushes in the persisted-notification store.
//!
//! Offline users never see a pushed frame, so directed pushes can be written
//! to the store first and polled later.

use tracing::{debug, error, warn};

use portal_core::result::AppResult;
use portal_core::traits::{NewNotification, NotificationRecord, NotificationStore};

/// Outcome of writing one notification for several users.
#[derive(Debug, Default)]
pub struct PersistReport {
    /// Records written, one per user that succeeded.
    pub records: Vec<NotificationRecord>,
    /// Users whose record could not be written.
    pub failed: Vec<String>,
}

impl PersistReport {
    /// Users that now hold a record, in write order.
    pub fn persisted_user_ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.user_id.clone()).collect()
    }
}

/// Persists one notification per user.
///
/// A store error for one user does not stop the others. The call fails only
/// when nothing at all was written.
pub async fn persist_for_users(
    store: &dyn NotificationStore,
    user_ids: &[String],
    notification: &NewNotification,
) -> AppResult<PersistReport> {
    let mut report = PersistReport {
        records: Vec::with_capacity(user_ids.len()),
        failed: Vec::new(),
    };
    let mut last_error = None;

    for user_id in user_ids {
        match store.create(user_id, notification.clone()).await {
            Ok(record) => {
                debug!(user_id = %user_id, notification_id = %record.id, "Notification persisted");
                report.records.push(record);
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to persist notification");
                report.failed.push(user_id.clone());
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if report.records.is_empty() => Err(e),
        _ => {
            if !report.failed.is_empty() {
                warn!(
                    persisted = report.records.len(),
                    failed = report.failed.len(),
                    "Notification persisted for some users only"
                );
            }
            Ok(report)
        }
    }
}
