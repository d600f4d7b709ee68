//! Event-stream channel management: channel handles, registry, heartbeat.

pub mod channel;
pub mod heartbeat;
pub mod registry;

pub use channel::{Channel, ChannelId, ChannelInfo, ChannelMetadata, CloseReason};
pub use registry::ConnectionRegistry;
