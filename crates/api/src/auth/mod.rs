//! Authentication primitives.
//!
//! - [`jwt`] -- JWT access-token generation and validation.

pub mod jwt;

/// Role allowed to act on any update.
pub const ROLE_ADMIN: &str = "admin";
