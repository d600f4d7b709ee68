//! Traits implemented by the real-time core's external collaborators.

pub mod notification_store;

pub use notification_store::{
    NewNotification, NotificationCounts, NotificationRecord, NotificationStore,
};
