//! Row types returned by the repositories.

pub mod attendance;
pub mod catalog;
pub mod observation;
