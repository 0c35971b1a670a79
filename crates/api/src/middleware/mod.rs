//! Authentication extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the acting user from a JWT Bearer token.
//! - [`auth::MaybeAuthUser`] -- Same, but anonymous requests are allowed.

pub mod auth;
