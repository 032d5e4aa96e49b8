//! Catalog rows: rooms, students, memberships.

use rollbook_core::scope::{Room, RoomMember, Student};
use rollbook_core::types::DbId;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct RoomRow {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub is_active: bool,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StudentRow {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub is_active: bool,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            is_active: row.is_active,
        }
    }
}

/// A `room_students` row joined with the student's name.
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub room_id: DbId,
    pub student_id: DbId,
    pub student_name: String,
    pub is_active: bool,
}

impl From<MemberRow> for RoomMember {
    fn from(row: MemberRow) -> Self {
        RoomMember {
            room_id: row.room_id,
            student_id: row.student_id,
            student_name: row.student_name,
            is_active: row.is_active,
        }
    }
}
