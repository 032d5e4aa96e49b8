//! Repository for the `attendance_records` table.

use rollbook_core::attendance::{AttendanceKey, AttendanceStatus};
use rollbook_core::period::DateRange;
use rollbook_core::types::{Date, DbId};
use sqlx::PgPool;

use crate::models::attendance::AttendanceRow;

/// Column list for `attendance_records` queries.
const COLUMNS: &str = "id, company_id, room_id, student_id, date, status, created_at, updated_at";

/// Provides query operations for attendance records.
pub struct AttendanceRepo;

impl AttendanceRepo {
    /// Insert or replace the status for an identity key.
    ///
    /// Uses `INSERT ... ON CONFLICT DO UPDATE` against
    /// `uq_attendance_records_key`, so concurrent writers to one key
    /// serialize in the database and the last committed status wins.
    pub async fn upsert(
        pool: &PgPool,
        key: &AttendanceKey,
        status: AttendanceStatus,
    ) -> Result<AttendanceRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO attendance_records (company_id, room_id, student_id, date, status) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT uq_attendance_records_key DO UPDATE SET \
                status = EXCLUDED.status, \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AttendanceRow>(&query)
            .bind(key.company_id)
            .bind(key.room_id)
            .bind(key.student_id)
            .bind(key.date)
            .bind(status.as_str())
            .fetch_one(pool)
            .await
    }

    /// Delete the record for one identity key. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, key: &AttendanceKey) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM attendance_records \
             WHERE company_id = $1 AND room_id = $2 AND student_id = $3 AND date = $4",
        )
        .bind(key.company_id)
        .bind(key.room_id)
        .bind(key.student_id)
        .bind(key.date)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every record of a room on a date. Returns the number of rows removed.
    pub async fn delete_day(
        pool: &PgPool,
        company_id: DbId,
        room_id: DbId,
        date: Date,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM attendance_records \
             WHERE company_id = $1 AND room_id = $2 AND date = $3",
        )
        .bind(company_id)
        .bind(room_id)
        .bind(date)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List the records of a room on a date.
    pub async fn list_day(
        pool: &PgPool,
        company_id: DbId,
        room_id: DbId,
        date: Date,
    ) -> Result<Vec<AttendanceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_records \
             WHERE company_id = $1 AND room_id = $2 AND date = $3 \
             ORDER BY student_id ASC"
        );
        sqlx::query_as::<_, AttendanceRow>(&query)
            .bind(company_id)
            .bind(room_id)
            .bind(date)
            .fetch_all(pool)
            .await
    }

    /// List records of the given rooms within an inclusive date range.
    pub async fn list_range(
        pool: &PgPool,
        company_id: DbId,
        room_ids: &[DbId],
        range: &DateRange,
    ) -> Result<Vec<AttendanceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_records \
             WHERE company_id = $1 AND room_id = ANY($2) AND date BETWEEN $3 AND $4 \
             ORDER BY date ASC, room_id ASC, student_id ASC"
        );
        sqlx::query_as::<_, AttendanceRow>(&query)
            .bind(company_id)
            .bind(room_ids)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(pool)
            .await
    }

    /// List one student's records within the given rooms and range.
    pub async fn list_student_range(
        pool: &PgPool,
        company_id: DbId,
        student_id: DbId,
        room_ids: &[DbId],
        range: &DateRange,
    ) -> Result<Vec<AttendanceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance_records \
             WHERE company_id = $1 AND student_id = $2 AND room_id = ANY($3) \
               AND date BETWEEN $4 AND $5 \
             ORDER BY date ASC, room_id ASC"
        );
        sqlx::query_as::<_, AttendanceRow>(&query)
            .bind(company_id)
            .bind(student_id)
            .bind(room_ids)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(pool)
            .await
    }
}
