//! Notification fan-out and persistence helpers.

pub mod dispatcher;
pub mod persistence;

pub use dispatcher::{DeliveryReport, PushDispatcher};
