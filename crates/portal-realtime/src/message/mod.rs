//! Frames pushed over an event stream.

pub mod types;

pub use types::{ConnectedData, PingData, StatsData, StreamEvent};
