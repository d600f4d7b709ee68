//! A single open event-stream channel.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::DeliveryError;
use crate::message::StreamEvent;

/// Unique channel identifier.
pub type ChannelId = String;

/// Best-effort origin details captured at admission, for diagnostics only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMetadata {
    /// Client `User-Agent`.
    pub user_agent: Option<String>,
    /// Client network address.
    pub remote_addr: Option<String>,
}

/// Why a channel left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// The client went away.
    ClientClosed,
    /// A frame could not be queued.
    WriteFailed,
    /// Replaced by a newer channel of the same user.
    Evicted,
    /// Not refreshed within the staleness timeout.
    TimedOut,
    /// The engine is shutting down.
    Shutdown,
}

impl CloseReason {
    /// Stable name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::WriteFailed => "write_failed",
            Self::Evicted => "evicted",
            Self::TimedOut => "timed_out",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
struct Refresh {
    at: Instant,
    at_utc: DateTime<Utc>,
}

/// Handle to one open channel.
///
/// Owned by the [`ConnectionRegistry`](super::ConnectionRegistry); everything
/// else holds a shared reference obtained through a registry lookup. Frames
/// are queued with [`Channel::send`] and drained by the transport from the
/// receiver returned at registration.
#[derive(Debug)]
pub struct Channel {
    /// Channel ID.
    pub id: ChannelId,
    /// Owning principal.
    pub user_id: String,
    /// Origin details.
    pub metadata: ChannelMetadata,
    /// Admission time (monotonic).
    pub opened_at: Instant,
    /// Admission time (wall clock).
    pub opened_at_utc: DateTime<Utc>,
    /// Registration order, breaks ties between equal `opened_at` values.
    pub(crate) seq: u64,
    last_refreshed: Mutex<Refresh>,
    sender: mpsc::Sender<StreamEvent>,
    closed: CancellationToken,
}

impl Channel {
    pub(crate) fn new(
        user_id: impl Into<String>,
        metadata: ChannelMetadata,
        seq: u64,
        sender: mpsc::Sender<StreamEvent>,
    ) -> Self {
        let now = Instant::now();
        let now_utc = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            metadata,
            opened_at: now,
            opened_at_utc: now_utc,
            seq,
            last_refreshed: Mutex::new(Refresh {
                at: now,
                at_utc: now_utc,
            }),
            sender,
            closed: CancellationToken::new(),
        }
    }

    /// Queues a frame without waiting.
    pub fn send(&self, event: StreamEvent) -> Result<(), DeliveryError> {
        if self.closed.is_cancelled() {
            return Err(DeliveryError::Closed);
        }
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Refreshes the liveness timestamp.
    pub fn touch(&self) {
        let mut refresh = self.last_refreshed.lock();
        refresh.at = Instant::now();
        refresh.at_utc = Utc::now();
    }

    /// Last liveness refresh (monotonic).
    pub fn last_refreshed(&self) -> Instant {
        self.last_refreshed.lock().at
    }

    /// Last liveness refresh (wall clock).
    pub fn last_refreshed_utc(&self) -> DateTime<Utc> {
        self.last_refreshed.lock().at_utc
    }

    /// Time since admission.
    pub fn uptime(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Signals the transport to end the stream.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Whether the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Token cancelled when the channel closes.
    pub fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Serializable snapshot for diagnostics.
    pub fn info(&self) -> ChannelInfo {
        ChannelInfo {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            opened_at: self.opened_at_utc,
            uptime_ms: self.uptime().as_millis() as u64,
            last_heartbeat: self.last_refreshed_utc(),
            user_agent: self.metadata.user_agent.clone(),
            remote_addr: self.metadata.remote_addr.clone(),
        }
    }
}

/// Per-channel listing entry exposed to elevated callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    /// Channel ID.
    pub id: ChannelId,
    /// Owning principal.
    pub user_id: String,
    /// Admission time.
    pub opened_at: DateTime<Utc>,
    /// Milliseconds since admission.
    pub uptime_ms: u64,
    /// Last liveness refresh.
    pub last_heartbeat: DateTime<Utc>,
    /// Client `User-Agent`.
    pub user_agent: Option<String>,
    /// Client network address.
    pub remote_addr: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(buffer: usize) -> (Channel, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Channel::new("u1", ChannelMetadata::default(), 0, tx), rx)
    }

    #[tokio::test]
    async fn test_send_reports_full_and_closed() {
        let (channel, rx) = channel(1);
        assert!(channel.send(StreamEvent::stats(0)).is_ok());
        assert_eq!(
            channel.send(StreamEvent::stats(1)),
            Err(DeliveryError::QueueFull)
        );

        drop(rx);
        assert_eq!(
            channel.send(StreamEvent::stats(2)),
            Err(DeliveryError::Closed)
        );
    }

    #[tokio::test]
    async fn test_close_rejects_further_sends() {
        let (channel, _rx) = channel(4);
        let token = channel.close_token();
        channel.close();
        assert!(token.is_cancelled());
        assert!(channel.is_closed());
        assert_eq!(
            channel.send(StreamEvent::stats(0)),
            Err(DeliveryError::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_and_uptime() {
        let (channel, _rx) = channel(4);
        let opened = channel.last_refreshed();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(channel.uptime(), Duration::from_secs(5));
        assert_eq!(channel.last_refreshed(), opened);

        channel.touch();
        assert_eq!(channel.last_refreshed(), opened + Duration::from_secs(5));
        assert_eq!(channel.info().uptime_ms, 5000);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let (a, _ra) = channel(1);
        let (b, _rb) = channel(1);
        assert_ne!(a.id, b.id);
    }
}
