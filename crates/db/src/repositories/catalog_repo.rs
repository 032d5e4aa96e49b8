//! Read-only queries over the catalog tables (`rooms`, `students`,
//! `room_students`, `user_rooms`).

use rollbook_core::types::DbId;
use sqlx::PgPool;

use crate::models::catalog::{MemberRow, RoomRow, StudentRow};

/// Provides catalog lookups used for scoping.
pub struct CatalogRepo;

impl CatalogRepo {
    /// All rooms of a company.
    pub async fn list_rooms(pool: &PgPool, company_id: DbId) -> Result<Vec<RoomRow>, sqlx::Error> {
        sqlx::query_as::<_, RoomRow>(
            "SELECT id, company_id, name, is_active FROM rooms \
             WHERE company_id = $1 \
             ORDER BY name ASC, id ASC",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    /// Room ids granted to a user within a company.
    pub async fn granted_room_ids(
        pool: &PgPool,
        company_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT room_id FROM user_rooms \
             WHERE company_id = $1 AND user_id = $2 \
             ORDER BY room_id ASC",
        )
        .bind(company_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Members of the given rooms, ordered by room then student name.
    pub async fn list_members(
        pool: &PgPool,
        company_id: DbId,
        room_ids: &[DbId],
    ) -> Result<Vec<MemberRow>, sqlx::Error> {
        sqlx::query_as::<_, MemberRow>(
            "SELECT rs.room_id, s.id AS student_id, s.name AS student_name, s.is_active \
             FROM room_students rs \
             INNER JOIN students s ON s.id = rs.student_id \
             INNER JOIN rooms r ON r.id = rs.room_id \
             WHERE r.company_id = $1 AND s.company_id = $1 AND rs.room_id = ANY($2) \
             ORDER BY rs.room_id ASC, s.name ASC, s.id ASC",
        )
        .bind(company_id)
        .bind(room_ids)
        .fetch_all(pool)
        .await
    }

    pub async fn find_student(
        pool: &PgPool,
        company_id: DbId,
        student_id: DbId,
    ) -> Result<Option<StudentRow>, sqlx::Error> {
        sqlx::query_as::<_, StudentRow>(
            "SELECT id, company_id, name, is_active FROM students \
             WHERE company_id = $1 AND id = $2",
        )
        .bind(company_id)
        .bind(student_id)
        .fetch_optional(pool)
        .await
    }

    /// Rooms a student is enrolled in.
    pub async fn student_room_ids(
        pool: &PgPool,
        company_id: DbId,
        student_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT rs.room_id FROM room_students rs \
             INNER JOIN rooms r ON r.id = rs.room_id \
             WHERE r.company_id = $1 AND rs.student_id = $2 \
             ORDER BY rs.room_id ASC",
        )
        .bind(company_id)
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    /// Case-insensitive name search over members of `room_ids`.
    pub async fn search_students(
        pool: &PgPool,
        company_id: DbId,
        room_ids: &[DbId],
        query: &str,
        limit: i64,
    ) -> Result<Vec<StudentRow>, sqlx::Error> {
        let pattern = format!("%{}%", escape_like(query));
        sqlx::query_as::<_, StudentRow>(
            "SELECT DISTINCT s.id, s.company_id, s.name, s.is_active \
             FROM students s \
             INNER JOIN room_students rs ON rs.student_id = s.id \
             WHERE s.company_id = $1 AND rs.room_id = ANY($2) \
               AND s.name ILIKE $3 ESCAPE '\\' \
             ORDER BY s.name ASC, s.id ASC \
             LIMIT $4",
        )
        .bind(company_id)
        .bind(room_ids)
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("ana"), "ana");
        assert_eq!(escape_like("50%_x\\"), "50\\%\\_x\\\\");
    }
}
