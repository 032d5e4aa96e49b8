//! Request extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the caller's identity and tenant from a JWT Bearer token.

pub mod auth;
