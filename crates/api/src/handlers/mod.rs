pub mod attendance;
pub mod observations;
pub mod periods;
pub mod reports;
pub mod rooms;
pub mod students;
