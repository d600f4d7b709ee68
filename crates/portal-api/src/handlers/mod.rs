//! Route handlers.

pub mod health;
pub mod push;
pub mod stats;
pub mod stream;
