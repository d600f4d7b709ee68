//! # portal-auth
//!
//! Resolves the principal behind a request. The notification core treats
//! authentication as an external collaborator: it only needs an opaque user
//! identity and a role, obtained through the [`Authenticator`] trait.

pub mod authenticator;
pub mod jwt;
pub mod principal;

pub use authenticator::{Authenticator, JwtAuthenticator};
pub use principal::{Principal, Role};
