//! Push dispatcher: fans notifications and broadcasts out to open channels.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use portal_core::config::RealtimeConfig;

use crate::connection::{Channel, CloseReason, ConnectionRegistry};
use crate::message::StreamEvent;
use crate::metrics::EngineMetrics;

/// Aggregate outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    /// Channels a frame was attempted against.
    pub attempted: usize,
    /// Channels that accepted the frame.
    pub delivered: usize,
    /// Channels that rejected the frame and were deregistered.
    pub failed: usize,
}

impl DeliveryReport {
    /// Adds another report's counts to this one.
    pub fn merge(&mut self, other: DeliveryReport) {
        self.attempted += other.attempted;
        self.delivered += other.delivered;
        self.failed += other.failed;
    }

    /// Share of attempts that failed, `0.0` when nothing was attempted.
    pub fn failure_ratio(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.failed as f64 / self.attempted as f64
        }
    }
}

/// Delivers payloads to users' channels or to every channel.
///
/// Sends never wait on a client: frames are queued with `try_send`, and a
/// channel that rejects one is deregistered while the fan-out continues.
#[derive(Debug)]
pub struct PushDispatcher {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<EngineMetrics>,
    failure_warn_ratio: f64,
    failure_warn_min_attempts: usize,
}

impl PushDispatcher {
    /// Creates a dispatcher over the registry.
    pub fn new(
        config: &RealtimeConfig,
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            registry,
            metrics,
            failure_warn_ratio: config.failure_warn_ratio,
            failure_warn_min_attempts: config.failure_warn_min_attempts,
        }
    }

    /// Pushes a `notification` frame to every channel of one user.
    ///
    /// A user with no open channel yields an empty report.
    pub fn send_to_user(&self, user_id: &str, payload: &serde_json::Value) -> DeliveryReport {
        let report = self.deliver_to_user(user_id, payload);
        self.observe("user", &report);
        report
    }

    /// Pushes a `notification` frame to every channel of each listed user.
    ///
    /// Duplicate ids are delivered once.
    pub fn send_to_users(&self, user_ids: &[String], payload: &serde_json::Value) -> DeliveryReport {
        let unique: BTreeSet<&str> = user_ids.iter().map(String::as_str).collect();
        let mut report = DeliveryReport::default();
        for user_id in unique {
            report.merge(self.deliver_to_user(user_id, payload));
        }
        self.observe("users", &report);
        report
    }

    /// Pushes a `broadcast` frame to every open channel.
    pub fn broadcast(&self, payload: &serde_json::Value) -> DeliveryReport {
        let event = StreamEvent::broadcast(payload.clone());
        let report = self.deliver(self.registry.all(), &event);
        self.observe("broadcast", &report);
        report
    }

    fn deliver_to_user(&self, user_id: &str, payload: &serde_json::Value) -> DeliveryReport {
        let channels = self.registry.by_user(user_id);
        if channels.is_empty() {
            debug!(user_id = %user_id, "No open channels, push dropped");
            return DeliveryReport::default();
        }
        self.deliver(channels, &StreamEvent::notification(payload.clone()))
    }

    fn deliver(&self, channels: Vec<Arc<Channel>>, event: &StreamEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for channel in channels {
            report.attempted += 1;
            match channel.send(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    debug!(
                        channel_id = %channel.id,
                        kind = event.kind(),
                        error = %e,
                        "Push write failed"
                    );
                    self.registry.deregister(&channel.id, CloseReason::WriteFailed);
                }
            }
        }
        self.metrics.add_messages_sent(report.delivered as u64);
        report
    }

    fn observe(&self, target: &'static str, report: &DeliveryReport) {
        if report.attempted >= self.failure_warn_min_attempts
            && report.failure_ratio() > self.failure_warn_ratio
        {
            warn!(
                target_kind = target,
                attempted = report.attempted,
                failed = report.failed,
                ratio = report.failure_ratio(),
                "High failure ratio in push fan-out"
            );
        } else {
            debug!(
                target_kind = target,
                attempted = report.attempted,
                delivered = report.delivered,
                "Push fan-out complete"
            );
        }
    }
}
