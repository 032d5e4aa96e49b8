//! `attendance_records` rows.

use rollbook_core::attendance::{AttendanceRecord, AttendanceStatus};
use rollbook_core::types::{Date, DbId, Timestamp};
use sqlx::FromRow;

use crate::error::DbError;

/// A row from the `attendance_records` table.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRow {
    pub id: DbId,
    pub company_id: DbId,
    pub room_id: DbId,
    pub student_id: DbId,
    pub date: Date,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = DbError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str_value(&row.status).map_err(|e| DbError::InvalidRow {
            table: "attendance_records",
            message: e.to_string(),
        })?;
        Ok(AttendanceRecord {
            company_id: row.company_id,
            room_id: row.room_id,
            student_id: row.student_id,
            date: row.date,
            status,
            updated_at: row.updated_at,
        })
    }
}

/// Convert a batch of rows, failing on the first unrepresentable one.
pub fn into_records(rows: Vec<AttendanceRow>) -> Result<Vec<AttendanceRecord>, DbError> {
    rows.into_iter().map(AttendanceRecord::try_from).collect()
}
