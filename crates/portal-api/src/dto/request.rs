//! Request DTOs with validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use portal_core::traits::NewNotification;

/// Push trigger body: `{ userIds, notification }` or `{ broadcast: true, notification }`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_target"))]
pub struct PushRequest {
    /// Target users for a directed push.
    #[serde(default)]
    #[validate(length(min = 1, max = 1000, message = "userIds must hold 1 to 1000 ids"))]
    pub user_ids: Option<Vec<String>>,
    /// Push to every open channel instead.
    #[serde(default)]
    pub broadcast: bool,
    /// Application-defined payload forwarded to clients unchanged.
    pub notification: serde_json::Value,
    /// Record the notification for each target user before pushing.
    #[serde(default)]
    pub persist: bool,
}

fn validate_target(req: &PushRequest) -> Result<(), ValidationError> {
    match (&req.user_ids, req.broadcast) {
        (Some(_), true) => Err(ValidationError::new("target")
            .with_message("Specify either userIds or broadcast, not both".into())),
        (None, false) => Err(ValidationError::new("target")
            .with_message("Specify userIds or broadcast: true".into())),
        _ => Ok(()),
    }
}

impl PushRequest {
    /// Directed targets with duplicates removed, in first-seen order.
    pub fn target_user_ids(&self) -> Option<Vec<String>> {
        let user_ids = self.user_ids.as_ref()?;
        let mut seen = HashSet::with_capacity(user_ids.len());
        Some(
            user_ids
                .iter()
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .collect(),
        )
    }

    /// Store input derived from the payload's `title`, `message` and
    /// `category` (or `type`) fields.
    pub fn to_new_notification(&self) -> NewNotification {
        let field = |name: &str| {
            self.notification
                .get(name)
                .and_then(|v| v.as_str())
                .map(String::from)
        };
        NewNotification {
            title: field("title").unwrap_or_else(|| "Notification".to_string()),
            message: field("message"),
            category: field("category").or_else(|| field("type")),
            payload: self.notification.clone(),
        }
    }
}

/// Query for the statistics endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    /// Include the per-channel listing (elevated callers only).
    #[serde(default)]
    pub detailed: bool,
}
