//! WebSocket infrastructure for change notifications and live reports.
//!
//! Provides connection management, report watches, heartbeat monitoring,
//! and the HTTP upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;
pub mod watch;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
pub use watch::ReportWatches;
