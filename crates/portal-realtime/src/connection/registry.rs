//! Authoritative table of open channels.
//!
//! All mutations happen under one write lock so that registration with
//! eviction is atomic with respect to concurrent registrations for the same
//! user. Read accessors take the shared lock and return owned snapshots.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use portal_core::config::RealtimeConfig;

use crate::error::AdmissionError;
use crate::message::StreamEvent;
use crate::metrics::EngineMetrics;

use super::channel::{Channel, ChannelId, ChannelMetadata, CloseReason};

#[derive(Debug, Default)]
struct RegistryState {
    by_id: HashMap<ChannelId, Arc<Channel>>,
    /// Per-user channels in registration order.
    by_user: HashMap<String, Vec<Arc<Channel>>>,
    /// Last disconnect per user, for the reconnection counter.
    recent_disconnects: HashMap<String, Instant>,
    next_seq: u64,
    shutting_down: bool,
}

impl RegistryState {
    fn user_count(&self, user_id: &str) -> usize {
        self.by_user.get(user_id).map_or(0, Vec::len)
    }

    fn oldest_for(&self, user_id: &str) -> Option<ChannelId> {
        self.by_user
            .get(user_id)?
            .iter()
            .min_by_key(|c| (c.opened_at, c.seq))
            .map(|c| c.id.clone())
    }

    fn remove(&mut self, id: &str) -> Option<Arc<Channel>> {
        let channel = self.by_id.remove(id)?;
        if let Some(list) = self.by_user.get_mut(&channel.user_id) {
            list.retain(|c| c.id != channel.id);
            if list.is_empty() {
                self.by_user.remove(&channel.user_id);
            }
        }
        Some(channel)
    }
}

/// Registry of open event-stream channels.
#[derive(Debug)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
    metrics: Arc<EngineMetrics>,
    max_per_user: usize,
    max_total: usize,
    buffer_size: usize,
    reconnect_window: Duration,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new(config: &RealtimeConfig, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            metrics,
            max_per_user: config.max_connections_per_user.max(1),
            max_total: config.max_connections,
            buffer_size: config.channel_buffer_size.max(1),
            reconnect_window: config.reconnect_window(),
        }
    }

    /// Admits a channel for `user_id`.
    ///
    /// If the user is already at the per-user ceiling, their oldest channel is
    /// closed and removed first. If the global ceiling is then still reached,
    /// the registration is refused. On success the channel is immediately
    /// visible to [`by_user`](Self::by_user) and [`all`](Self::all).
    pub fn register(
        &self,
        user_id: &str,
        metadata: ChannelMetadata,
    ) -> Result<(Arc<Channel>, mpsc::Receiver<StreamEvent>), AdmissionError> {
        let mut state = self.state.write();

        if state.shutting_down {
            return Err(AdmissionError::ShuttingDown);
        }

        let mut evicted = Vec::new();
        while state.user_count(user_id) >= self.max_per_user {
            let Some(oldest) = state.oldest_for(user_id) else {
                break;
            };
            if let Some(channel) = state.remove(&oldest) {
                evicted.push(channel);
            }
        }
        for channel in &evicted {
            channel.close();
            self.metrics.inc_evictions();
            warn!(
                channel_id = %channel.id,
                user_id = %user_id,
                max = self.max_per_user,
                "User at max channels, oldest evicted"
            );
        }

        if state.by_id.len() >= self.max_total {
            self.metrics.inc_capacity_rejections();
            warn!(
                user_id = %user_id,
                active = state.by_id.len(),
                max = self.max_total,
                "Channel capacity reached, registration refused"
            );
            return Err(AdmissionError::CapacityExceeded {
                limit: self.max_total,
            });
        }

        if let Some(disconnected_at) = state.recent_disconnects.remove(user_id) {
            if disconnected_at.elapsed() <= self.reconnect_window {
                self.metrics.inc_reconnections();
                debug!(user_id = %user_id, "Reconnection within window");
            }
        }

        let (tx, rx) = mpsc::channel(self.buffer_size);
        let seq = state.next_seq;
        state.next_seq += 1;
        let channel = Arc::new(Channel::new(user_id, metadata, seq, tx));

        state.by_id.insert(channel.id.clone(), channel.clone());
        state
            .by_user
            .entry(user_id.to_string())
            .or_default()
            .push(channel.clone());
        self.metrics.inc_connections();

        info!(
            channel_id = %channel.id,
            user_id = %user_id,
            user_channels = state.user_count(user_id),
            active = state.by_id.len(),
            "Channel registered"
        );

        Ok((channel, rx))
    }

    /// Removes a channel and closes it. Removing an absent id is a no-op.
    ///
    /// Returns whether a channel was removed.
    pub fn deregister(&self, channel_id: &str, reason: CloseReason) -> bool {
        let removed = {
            let mut state = self.state.write();
            let removed = state.remove(channel_id);
            if let Some(channel) = &removed {
                if !matches!(reason, CloseReason::Evicted | CloseReason::Shutdown) {
                    state
                        .recent_disconnects
                        .insert(channel.user_id.clone(), Instant::now());
                }
            }
            removed
        };

        let Some(channel) = removed else {
            return false;
        };
        channel.close();

        match reason {
            CloseReason::WriteFailed => {
                self.metrics.inc_errors();
                warn!(channel_id = %channel.id, user_id = %channel.user_id, "Channel write failed, closed");
            }
            CloseReason::TimedOut => {
                self.metrics.inc_timeouts();
                warn!(
                    channel_id = %channel.id,
                    user_id = %channel.user_id,
                    "Channel heartbeat timeout, closed"
                );
            }
            CloseReason::Evicted => {
                self.metrics.inc_evictions();
                warn!(channel_id = %channel.id, user_id = %channel.user_id, "Channel evicted");
            }
            CloseReason::ClientClosed | CloseReason::Shutdown => {
                info!(
                    channel_id = %channel.id,
                    user_id = %channel.user_id,
                    reason = %reason,
                    uptime_ms = channel.uptime().as_millis() as u64,
                    "Channel closed"
                );
            }
        }
        true
    }

    /// Looks up a channel.
    pub fn get(&self, channel_id: &str) -> Option<Arc<Channel>> {
        self.state.read().by_id.get(channel_id).cloned()
    }

    /// A user's channels in registration order.
    pub fn by_user(&self, user_id: &str) -> Vec<Arc<Channel>> {
        self.state
            .read()
            .by_user
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// All channels in registration order.
    pub fn all(&self) -> Vec<Arc<Channel>> {
        let mut channels: Vec<_> = self.state.read().by_id.values().cloned().collect();
        channels.sort_by_key(|c| c.seq);
        channels
    }

    /// Refreshes a channel's liveness timestamp. Returns `false` if absent.
    pub fn touch(&self, channel_id: &str) -> bool {
        match self.state.read().by_id.get(channel_id) {
            Some(channel) => {
                channel.touch();
                true
            }
            None => false,
        }
    }

    /// Number of open channels.
    pub fn len(&self) -> usize {
        self.state.read().by_id.len()
    }

    /// Whether no channel is open.
    pub fn is_empty(&self) -> bool {
        self.state.read().by_id.is_empty()
    }

    /// Number of open channels for one user.
    pub fn user_connection_count(&self, user_id: &str) -> usize {
        self.state.read().user_count(user_id)
    }

    /// Open channel counts grouped by user.
    pub fn counts_by_user(&self) -> BTreeMap<String, usize> {
        self.state
            .read()
            .by_user
            .iter()
            .map(|(user, list)| (user.clone(), list.len()))
            .collect()
    }

    /// Channels not refreshed within `timeout`.
    pub fn stale_channels(&self, timeout: Duration) -> Vec<Arc<Channel>> {
        let now = Instant::now();
        self.state
            .read()
            .by_id
            .values()
            .filter(|c| now.duration_since(c.last_refreshed()) > timeout)
            .cloned()
            .collect()
    }

    /// Forgets disconnects older than the reconnect window.
    pub fn prune_recent_disconnects(&self) -> usize {
        let window = self.reconnect_window;
        let mut state = self.state.write();
        let before = state.recent_disconnects.len();
        state
            .recent_disconnects
            .retain(|_, at| at.elapsed() <= window);
        before - state.recent_disconnects.len()
    }

    /// Whether [`close_all`](Self::close_all) has run.
    pub fn is_shutting_down(&self) -> bool {
        self.state.read().shutting_down
    }

    /// Refuses further registrations and closes every channel.
    ///
    /// Returns the number of channels closed.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<Channel>> = {
            let mut state = self.state.write();
            state.shutting_down = true;
            state.by_user.clear();
            state.recent_disconnects.clear();
            state.by_id.drain().map(|(_, c)| c).collect()
        };
        for channel in &drained {
            channel.close();
        }
        info!(count = drained.len(), "All channels closed");
        drained.len()
    }
}
