//! `observations` rows.

use rollbook_core::attendance::Observation;
use rollbook_core::types::{Date, DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `observations` table.
#[derive(Debug, Clone, FromRow)]
pub struct ObservationRow {
    pub id: DbId,
    pub company_id: DbId,
    pub student_id: DbId,
    pub date: Date,
    pub text: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Self {
        Observation {
            company_id: row.company_id,
            student_id: row.student_id,
            date: row.date,
            text: row.text,
            updated_at: row.updated_at,
        }
    }
}
