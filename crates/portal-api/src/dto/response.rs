//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use portal_core::traits::NotificationCounts;
use portal_realtime::{AggregateStats, ChannelInfo};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Push trigger result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    /// Channels the payload was attempted against.
    pub attempted: usize,
    /// Channels that accepted it.
    pub delivered: usize,
    /// Notifications written to the store.
    pub persisted: usize,
    /// Targets whose record could not be written and were not pushed.
    pub persist_failed: usize,
}

/// Statistics endpoint body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Caller's own notification counts.
    pub notifications: NotificationCounts,
    /// Caller's open channels.
    pub user_connections: usize,
    /// Engine-wide statistics, elevated callers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateStats>,
    /// Per-channel listing, elevated callers with `detailed=true` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<ChannelInfo>>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Uptime.
    pub uptime_seconds: u64,
    /// Open event-stream channels.
    pub active_channels: usize,
    /// Response time.
    pub timestamp: DateTime<Utc>,
}
