//! # portal-database
//!
//! Implementations of the [`NotificationStore`](portal_core::traits::NotificationStore)
//! collaborator: a PostgreSQL repository for deployments and an in-memory
//! store for development and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use memory::MemoryNotificationStore;
pub use repositories::notification::NotificationRepository;
