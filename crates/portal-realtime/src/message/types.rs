//! Outbound event-stream frame definitions.
//!
//! Every frame serializes to `{ "type": ..., "data"?: ..., "timestamp": ...,
//! "connectionId"?: ... }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters included in the `connected` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedData {
    /// Open channels across all users.
    pub active_connections: usize,
    /// Open channels for the connecting user, including this one.
    pub user_connections: usize,
}

/// Payload of a keep-alive frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingData {
    /// Milliseconds since the channel was admitted.
    pub uptime_ms: u64,
}

/// Payload of the initial `stats` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    /// Unread notifications for the channel owner.
    pub unread_count: u64,
}

/// Frames sent from the server to a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    /// Sent once right after admission.
    Connected {
        /// Assigned channel id.
        connection_id: String,
        /// Counters at admission time.
        data: ConnectedData,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
    /// Keep-alive sent every heartbeat interval.
    Ping {
        /// Channel id.
        connection_id: String,
        /// Channel uptime.
        data: PingData,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
    /// Sent once after admission with the owner's unread count.
    Stats {
        /// Unread counter.
        data: StatsData,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
    /// Directed push to one user's channels.
    Notification {
        /// Application-defined payload.
        data: serde_json::Value,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
    /// Announcement pushed to every open channel.
    Broadcast {
        /// Application-defined payload.
        data: serde_json::Value,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
}

impl StreamEvent {
    /// Builds a `connected` frame.
    pub fn connected(connection_id: impl Into<String>, data: ConnectedData) -> Self {
        Self::Connected {
            connection_id: connection_id.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Builds a `ping` frame.
    pub fn ping(connection_id: impl Into<String>, uptime_ms: u64) -> Self {
        Self::Ping {
            connection_id: connection_id.into(),
            data: PingData { uptime_ms },
            timestamp: Utc::now(),
        }
    }

    /// Builds a `stats` frame.
    pub fn stats(unread_count: u64) -> Self {
        Self::Stats {
            data: StatsData { unread_count },
            timestamp: Utc::now(),
        }
    }

    /// Builds a `notification` frame.
    pub fn notification(data: serde_json::Value) -> Self {
        Self::Notification {
            data,
            timestamp: Utc::now(),
        }
    }

    /// Builds a `broadcast` frame.
    pub fn broadcast(data: serde_json::Value) -> Self {
        Self::Broadcast {
            data,
            timestamp: Utc::now(),
        }
    }

    /// The wire `type` discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Ping { .. } => "ping",
            Self::Stats { .. } => "stats",
            Self::Notification { .. } => "notification",
            Self::Broadcast { .. } => "broadcast",
        }
    }
}
