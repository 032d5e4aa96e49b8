//! Rollbook domain core.
//!
//! Attendance status values, tenant and room scoping, period presets,
//! aggregation, and the storage traits the engine runs against. This crate
//! has no internal dependencies; the PostgreSQL backend lives in
//! `rollbook-db` and the HTTP surface in `rollbook-api`.

pub mod attendance;
pub mod error;
pub mod memory;
pub mod period;
pub mod scope;
pub mod stats;
pub mod store;
pub mod types;
