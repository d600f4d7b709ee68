//! # portal-core
//!
//! Core crate for the school portal notification service. Contains the
//! configuration schemas, the unified error type, and the traits through
//! which the real-time core talks to its external collaborators.
//!
//! This crate has **no** internal dependencies on other portal crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
