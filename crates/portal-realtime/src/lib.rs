//! # portal-realtime
//!
//! Server-side push core for the school portal. Provides:
//!
//! - Sliding-window admission control keyed by principal and network origin
//! - The authoritative registry of open event-stream channels, with per-user
//!   oldest-first eviction and a global capacity ceiling
//! - A heartbeat task that pings every channel and prunes stale ones
//! - Fan-out of notifications and broadcasts with per-channel failure isolation
//! - Point-in-time statistics for the stats endpoint

pub mod connection;
pub mod error;
pub mod message;
pub mod metrics;
pub mod notification;
pub mod rate_limit;
pub mod server;

pub use connection::heartbeat::{HeartbeatHandle, HeartbeatScheduler};
pub use connection::registry::ConnectionRegistry;
pub use connection::{Channel, ChannelId, ChannelInfo, ChannelMetadata, CloseReason};
pub use error::{AdmissionError, DeliveryError};
pub use message::StreamEvent;
pub use metrics::stats::{AggregateStats, StatsAggregator};
pub use notification::dispatcher::{DeliveryReport, PushDispatcher};
pub use rate_limit::{RateLimitDecision, RateLimitKey, RateLimiter};
pub use server::RealtimeEngine;
