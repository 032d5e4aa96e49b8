//! Change notification routing.
//!
//! The [`NotificationRouter`] subscribes to the event bus, pushes
//! "something changed" frames to authorized WebSocket clients, and fires
//! matching live report watches.

pub mod router;

pub use router::NotificationRouter;
