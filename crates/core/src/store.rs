//! Storage seams for the attendance engine.
//!
//! The engine talks to storage only through these traits so the same
//! authorization and aggregation logic runs over PostgreSQL
//! (`rollbook_db::PgStore`) or the in-process [`MemoryStore`](crate::memory::MemoryStore).
//!
//! Implementations must filter every query by `company_id` and must keep
//! the identity-key uniqueness of attendance records and observations with
//! an atomic upsert: the last completed write for a key wins.

use async_trait::async_trait;

use crate::attendance::{AttendanceKey, AttendanceRecord, AttendanceStatus, Observation};
use crate::error::CoreResult;
use crate::period::DateRange;
use crate::scope::{Room, RoomMember, Student};
use crate::types::{Date, DbId};

/// Read-only view of the catalog owned by the surrounding application.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All rooms of a company, active or not.
    async fn list_rooms(&self, company_id: DbId) -> CoreResult<Vec<Room>>;

    /// Room ids named by the user's grants. May include inactive rooms.
    async fn granted_room_ids(&self, company_id: DbId, user_id: DbId) -> CoreResult<Vec<DbId>>;

    /// Members of the given rooms, ordered by room then student name.
    async fn list_members(&self, company_id: DbId, room_ids: &[DbId]) -> CoreResult<Vec<RoomMember>>;

    async fn find_student(&self, company_id: DbId, student_id: DbId) -> CoreResult<Option<Student>>;

    /// Rooms the student is enrolled in.
    async fn student_room_ids(&self, company_id: DbId, student_id: DbId) -> CoreResult<Vec<DbId>>;

    /// Case-insensitive substring search over student names, restricted to
    /// members of `room_ids`.
    async fn search_students(
        &self,
        company_id: DbId,
        room_ids: &[DbId],
        query: &str,
        limit: i64,
    ) -> CoreResult<Vec<Student>>;
}

/// Attendance record persistence.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Insert or replace the record for `key`.
    async fn upsert_status(&self, key: AttendanceKey, status: AttendanceStatus) -> CoreResult<AttendanceRecord>;

    /// Delete one record. Returns `false` when none existed.
    async fn delete_status(&self, key: AttendanceKey) -> CoreResult<bool>;

    /// Delete every record of a room on a date. Returns the number removed.
    async fn delete_day(&self, company_id: DbId, room_id: DbId, date: Date) -> CoreResult<u64>;

    async fn list_day(&self, company_id: DbId, room_id: DbId, date: Date) -> CoreResult<Vec<AttendanceRecord>>;

    /// Records of `room_ids` within `range`, ordered by date, room, student.
    async fn list_range(
        &self,
        company_id: DbId,
        room_ids: &[DbId],
        range: DateRange,
    ) -> CoreResult<Vec<AttendanceRecord>>;

    /// One student's records within `room_ids` and `range`.
    async fn list_student_range(
        &self,
        company_id: DbId,
        student_id: DbId,
        room_ids: &[DbId],
        range: DateRange,
    ) -> CoreResult<Vec<AttendanceRecord>>;
}

/// Observation persistence.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Insert or replace the note for `(company, student, date)`.
    async fn upsert_observation(
        &self,
        company_id: DbId,
        student_id: DbId,
        date: Date,
        text: &str,
    ) -> CoreResult<Observation>;

    async fn delete_observation(&self, company_id: DbId, student_id: DbId, date: Date) -> CoreResult<bool>;

    /// Delete the notes of `student_ids` on `date`. Returns the number removed.
    async fn delete_observations(&self, company_id: DbId, student_ids: &[DbId], date: Date) -> CoreResult<u64>;

    async fn list_observations(
        &self,
        company_id: DbId,
        student_ids: &[DbId],
        date: Date,
    ) -> CoreResult<Vec<Observation>>;
}
