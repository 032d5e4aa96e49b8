//! Authentication primitives.
//!
//! - [`jwt`] -- JWT access-token generation and validation. Tokens are
//!   issued by the surrounding application; this service only verifies them.

pub mod jwt;
