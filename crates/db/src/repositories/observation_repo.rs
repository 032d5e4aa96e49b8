//! Repository for the `observations` table.

use rollbook_core::types::{Date, DbId};
use sqlx::PgPool;

use crate::models::observation::ObservationRow;

/// Column list for `observations` queries.
const COLUMNS: &str = "id, company_id, student_id, date, text, created_at, updated_at";

/// Provides query operations for per-student daily observations.
pub struct ObservationRepo;

impl ObservationRepo {
    /// Insert or replace the note for `(company, student, date)`.
    pub async fn upsert(
        pool: &PgPool,
        company_id: DbId,
        student_id: DbId,
        date: Date,
        text: &str,
    ) -> Result<ObservationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO observations (company_id, student_id, date, text) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_observations_key DO UPDATE SET \
                text = EXCLUDED.text, \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ObservationRow>(&query)
            .bind(company_id)
            .bind(student_id)
            .bind(date)
            .bind(text)
            .fetch_one(pool)
            .await
    }

    /// Delete one note. Returns `true` if a row was removed.
    pub async fn delete(
        pool: &PgPool,
        company_id: DbId,
        student_id: DbId,
        date: Date,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM observations WHERE company_id = $1 AND student_id = $2 AND date = $3",
        )
        .bind(company_id)
        .bind(student_id)
        .bind(date)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the notes of several students on one date.
    pub async fn delete_for_students(
        pool: &PgPool,
        company_id: DbId,
        student_ids: &[DbId],
        date: Date,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM observations \
             WHERE company_id = $1 AND student_id = ANY($2) AND date = $3",
        )
        .bind(company_id)
        .bind(student_ids)
        .bind(date)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List the notes of several students on one date.
    pub async fn list_for_students(
        pool: &PgPool,
        company_id: DbId,
        student_ids: &[DbId],
        date: Date,
    ) -> Result<Vec<ObservationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM observations \
             WHERE company_id = $1 AND student_id = ANY($2) AND date = $3 \
             ORDER BY student_id ASC"
        );
        sqlx::query_as::<_, ObservationRow>(&query)
            .bind(company_id)
            .bind(student_ids)
            .bind(date)
            .fetch_all(pool)
            .await
    }
}
