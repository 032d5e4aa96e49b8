//! [`PgStore`]: the `rollbook-core` storage traits over PostgreSQL.

use async_trait::async_trait;
use rollbook_core::attendance::{AttendanceKey, AttendanceRecord, AttendanceStatus, Observation};
use rollbook_core::error::{CoreError, CoreResult};
use rollbook_core::period::DateRange;
use rollbook_core::scope::{Room, RoomMember, Student};
use rollbook_core::store::{AttendanceStore, CatalogStore, ObservationStore};
use rollbook_core::types::{Date, DbId};

use crate::error::DbError;
use crate::models::attendance::into_records;
use crate::repositories::{AttendanceRepo, CatalogRepo, ObservationRepo};
use crate::DbPool;

/// PostgreSQL-backed storage. Cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn db_err(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database query failed");
    DbError::from(err).into()
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_rooms(&self, company_id: DbId) -> CoreResult<Vec<Room>> {
        let rows = CatalogRepo::list_rooms(&self.pool, company_id)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Room::from).collect())
    }

    async fn granted_room_ids(&self, company_id: DbId, user_id: DbId) -> CoreResult<Vec<DbId>> {
        CatalogRepo::granted_room_ids(&self.pool, company_id, user_id)
            .await
            .map_err(db_err)
    }

    async fn list_members(&self, company_id: DbId, room_ids: &[DbId]) -> CoreResult<Vec<RoomMember>> {
        let rows = CatalogRepo::list_members(&self.pool, company_id, room_ids)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(RoomMember::from).collect())
    }

    async fn find_student(&self, company_id: DbId, student_id: DbId) -> CoreResult<Option<Student>> {
        let row = CatalogRepo::find_student(&self.pool, company_id, student_id)
            .await
            .map_err(db_err)?;
        Ok(row.map(Student::from))
    }

    async fn student_room_ids(&self, company_id: DbId, student_id: DbId) -> CoreResult<Vec<DbId>> {
        CatalogRepo::student_room_ids(&self.pool, company_id, student_id)
            .await
            .map_err(db_err)
    }

    async fn search_students(
        &self,
        company_id: DbId,
        room_ids: &[DbId],
        query: &str,
        limit: i64,
    ) -> CoreResult<Vec<Student>> {
        let rows = CatalogRepo::search_students(&self.pool, company_id, room_ids, query, limit)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Student::from).collect())
    }
}

#[async_trait]
impl AttendanceStore for PgStore {
    async fn upsert_status(&self, key: AttendanceKey, status: AttendanceStatus) -> CoreResult<AttendanceRecord> {
        let row = AttendanceRepo::upsert(&self.pool, &key, status)
            .await
            .map_err(db_err)?;
        Ok(AttendanceRecord::try_from(row)?)
    }

    async fn delete_status(&self, key: AttendanceKey) -> CoreResult<bool> {
        AttendanceRepo::delete(&self.pool, &key).await.map_err(db_err)
    }

    async fn delete_day(&self, company_id: DbId, room_id: DbId, date: Date) -> CoreResult<u64> {
        AttendanceRepo::delete_day(&self.pool, company_id, room_id, date)
            .await
            .map_err(db_err)
    }

    async fn list_day(&self, company_id: DbId, room_id: DbId, date: Date) -> CoreResult<Vec<AttendanceRecord>> {
        let rows = AttendanceRepo::list_day(&self.pool, company_id, room_id, date)
            .await
            .map_err(db_err)?;
        Ok(into_records(rows)?)
    }

    async fn list_range(
        &self,
        company_id: DbId,
        room_ids: &[DbId],
        range: DateRange,
    ) -> CoreResult<Vec<AttendanceRecord>> {
        let rows = AttendanceRepo::list_range(&self.pool, company_id, room_ids, &range)
            .await
            .map_err(db_err)?;
        Ok(into_records(rows)?)
    }

    async fn list_student_range(
        &self,
        company_id: DbId,
        student_id: DbId,
        room_ids: &[DbId],
        range: DateRange,
    ) -> CoreResult<Vec<AttendanceRecord>> {
        let rows = AttendanceRepo::list_student_range(&self.pool, company_id, student_id, room_ids, &range)
            .await
            .map_err(db_err)?;
        Ok(into_records(rows)?)
    }
}

#[async_trait]
impl ObservationStore for PgStore {
    async fn upsert_observation(
        &self,
        company_id: DbId,
        student_id: DbId,
        date: Date,
        text: &str,
    ) -> CoreResult<Observation> {
        let row = ObservationRepo::upsert(&self.pool, company_id, student_id, date, text)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }

    async fn delete_observation(&self, company_id: DbId, student_id: DbId, date: Date) -> CoreResult<bool> {
        ObservationRepo::delete(&self.pool, company_id, student_id, date)
            .await
            .map_err(db_err)
    }

    async fn delete_observations(&self, company_id: DbId, student_ids: &[DbId], date: Date) -> CoreResult<u64> {
        ObservationRepo::delete_for_students(&self.pool, company_id, student_ids, date)
            .await
            .map_err(db_err)
    }

    async fn list_observations(
        &self,
        company_id: DbId,
        student_ids: &[DbId],
        date: Date,
    ) -> CoreResult<Vec<Observation>> {
        let rows = ObservationRepo::list_for_students(&self.pool, company_id, student_ids, date)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Observation::from).collect())
    }
}
