//! Point-in-time statistics derived from the registry and counters.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::connection::{ChannelInfo, ConnectionRegistry};

use super::EngineMetrics;

/// Serializable statistics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    /// Channels ever admitted since start.
    pub total_connections: u64,
    /// Channels currently open.
    pub active_connections: usize,
    /// Open channels per user.
    pub connections_by_user: BTreeMap<String, usize>,
    /// Channels removed after a failed write.
    pub errors: u64,
    /// Admissions shortly after the same user's disconnect.
    pub reconnections: u64,
    /// Channels evicted by the per-user ceiling.
    pub evictions: u64,
    /// Channels pruned as stale.
    pub timeouts: u64,
    /// Admissions refused by the rate limiter.
    pub rate_limited: u64,
    /// Admissions refused at the global ceiling.
    pub capacity_rejections: u64,
    /// Push frames queued.
    pub messages_sent: u64,
}

/// Read-side view over the registry and engine counters.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<EngineMetrics>,
}

impl StatsAggregator {
    /// Creates an aggregator.
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Arc<EngineMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Current statistics.
    pub fn snapshot(&self) -> AggregateStats {
        let connections_by_user = self.registry.counts_by_user();
        let active_connections = connections_by_user.values().sum();
        let m = &self.metrics;
        AggregateStats {
            total_connections: EngineMetrics::load(&m.connections_total),
            active_connections,
            connections_by_user,
            errors: EngineMetrics::load(&m.errors),
            reconnections: EngineMetrics::load(&m.reconnections),
            evictions: EngineMetrics::load(&m.evictions),
            timeouts: EngineMetrics::load(&m.timeouts),
            rate_limited: EngineMetrics::load(&m.rate_limited),
            capacity_rejections: EngineMetrics::load(&m.capacity_rejections),
            messages_sent: EngineMetrics::load(&m.messages_sent),
        }
    }

    /// Per-channel listing in registration order.
    pub fn channels(&self) -> Vec<ChannelInfo> {
        self.registry.all().iter().map(|c| c.info()).collect()
    }
}
