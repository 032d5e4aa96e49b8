//! Rollbook change notification infrastructure.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ChangeEvent`]: a "something changed" trigger scoped by company,
//!   room, and date. It carries no record payload; consumers re-read.
//! - [`recompute`]: latest-wins driver that restarts an in-flight
//!   computation when a newer trigger arrives.

pub mod bus;
pub mod recompute;

pub use bus::{ChangeEvent, ChangeFilter, ChangeKind, EventBus};
pub use recompute::{run_latest_wins, RecomputeStats, RecomputeTrigger};
