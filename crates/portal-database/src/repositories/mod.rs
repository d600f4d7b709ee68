//! PostgreSQL repositories.

pub mod notification;
