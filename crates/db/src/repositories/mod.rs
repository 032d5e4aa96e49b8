//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument. Every query is filtered by
//! `company_id`.

pub mod attendance_repo;
pub mod catalog_repo;
pub mod observation_repo;

pub use attendance_repo::AttendanceRepo;
pub use catalog_repo::CatalogRepo;
pub use observation_repo::ObservationRepo;
