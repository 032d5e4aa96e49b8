//! Attendance status values, identity keys, and record types.
//!
//! An attendance record is identified by the four-tuple
//! `(company, room, student, date)`; at most one record may exist per key.
//! Observations are keyed by `(company, student, date)` and carry no room.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Date, DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const STATUS_PRESENT: &str = "present";
pub const STATUS_ABSENT: &str = "absent";
pub const STATUS_LATE: &str = "late";
pub const STATUS_JUSTIFIED: &str = "justified";

/// All valid status strings, in display order.
pub const VALID_STATUSES: &[&str] = &[STATUS_PRESENT, STATUS_ABSENT, STATUS_LATE, STATUS_JUSTIFIED];

/// Earliest calendar year accepted for an attendance or observation date.
pub const MIN_RECORD_YEAR: i32 = 1900;

/// Latest calendar year accepted for an attendance or observation date.
pub const MAX_RECORD_YEAR: i32 = 2999;

/// Maximum length of an observation note, in characters.
pub const MAX_OBSERVATION_LENGTH: usize = 2000;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Daily attendance status of one student in one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Justified,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 4] = [Self::Present, Self::Absent, Self::Late, Self::Justified];

    /// Convert from a database or query-string value.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            STATUS_PRESENT => Ok(Self::Present),
            STATUS_ABSENT => Ok(Self::Absent),
            STATUS_LATE => Ok(Self::Late),
            STATUS_JUSTIFIED => Ok(Self::Justified),
            _ => Err(CoreError::Validation(format!(
                "Invalid attendance status '{s}'. Must be one of: {}",
                VALID_STATUSES.join(", ")
            ))),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => STATUS_PRESENT,
            Self::Absent => STATUS_ABSENT,
            Self::Late => STATUS_LATE,
            Self::Justified => STATUS_JUSTIFIED,
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Composite identity of an [`AttendanceRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttendanceKey {
    pub company_id: DbId,
    pub room_id: DbId,
    pub student_id: DbId,
    pub date: Date,
}

impl AttendanceKey {
    pub fn new(company_id: DbId, room_id: DbId, student_id: DbId, date: Date) -> Self {
        Self {
            company_id,
            room_id,
            student_id,
            date,
        }
    }

    /// Reject keys with non-positive ids or an out-of-range date.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_id(self.company_id, "company_id")?;
        validate_id(self.room_id, "room_id")?;
        validate_id(self.student_id, "student_id")?;
        validate_record_date(self.date)
    }
}

/// One student's status in one room on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub company_id: DbId,
    pub room_id: DbId,
    pub student_id: DbId,
    pub date: Date,
    pub status: AttendanceStatus,
    pub updated_at: Timestamp,
}

impl AttendanceRecord {
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey::new(self.company_id, self.room_id, self.student_id, self.date)
    }
}

/// A free-text note about a student on a given day, independent of room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub company_id: DbId,
    pub student_id: DbId,
    pub date: Date,
    pub text: String,
    pub updated_at: Timestamp,
}

/// Outcome of one entry in a bulk status write.
#[derive(Debug, Clone, Serialize)]
pub struct BulkEntryFailure {
    pub student_id: DbId,
    pub code: &'static str,
    pub error: String,
}

/// Per-entry results of a bulk status write. Entries commit independently.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkSetResult {
    pub succeeded: Vec<DbId>,
    pub failed: Vec<BulkEntryFailure>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that an id is a positive database key.
pub fn validate_id(id: DbId, name: &str) -> Result<(), CoreError> {
    if id <= 0 {
        return Err(CoreError::Validation(format!(
            "{name} must be a positive id, got {id}"
        )));
    }
    Ok(())
}

/// Validate that a date lies inside the representable record range.
pub fn validate_record_date(date: Date) -> Result<(), CoreError> {
    let year = date.year();
    if !(MIN_RECORD_YEAR..=MAX_RECORD_YEAR).contains(&year) {
        return Err(CoreError::Validation(format!(
            "date {date} is outside the supported range {MIN_RECORD_YEAR}-{MAX_RECORD_YEAR}"
        )));
    }
    Ok(())
}

/// Normalize an observation note. Blank text means "clear the observation".
pub fn normalize_observation_text(text: &str) -> Result<Option<String>, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let len = trimmed.chars().count();
    if len > MAX_OBSERVATION_LENGTH {
        return Err(CoreError::Validation(format!(
            "observation must be at most {MAX_OBSERVATION_LENGTH} characters, got {len}"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in AttendanceStatus::ALL {
            assert_eq!(AttendanceStatus::from_str_value(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_validation_error() {
        assert_matches!(
            AttendanceStatus::from_str_value("sick"),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            AttendanceStatus::from_str_value("Present"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn status_displays_as_database_value() {
        assert_eq!(AttendanceStatus::Justified.to_string(), "justified");
        assert_eq!(AttendanceStatus::Late.to_string(), STATUS_LATE);
    }

    #[test]
    fn key_rejects_missing_components() {
        assert!(AttendanceKey::new(1, 2, 3, d(2024, 1, 10)).validate().is_ok());
        assert_matches!(
            AttendanceKey::new(0, 2, 3, d(2024, 1, 10)).validate(),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            AttendanceKey::new(1, -2, 3, d(2024, 1, 10)).validate(),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            AttendanceKey::new(1, 2, 3, d(1850, 1, 10)).validate(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn record_date_bounds_are_inclusive() {
        assert!(validate_record_date(d(MIN_RECORD_YEAR, 1, 1)).is_ok());
        assert!(validate_record_date(d(MAX_RECORD_YEAR, 12, 31)).is_ok());
        assert!(validate_record_date(d(MAX_RECORD_YEAR + 1, 1, 1)).is_err());
    }

    #[test]
    fn blank_observation_clears() {
        assert_eq!(normalize_observation_text("   ").unwrap(), None);
        assert_eq!(
            normalize_observation_text("  left early \n").unwrap().as_deref(),
            Some("left early")
        );
    }

    #[test]
    fn overlong_observation_rejected() {
        let text = "x".repeat(MAX_OBSERVATION_LENGTH + 1);
        assert_matches!(
            normalize_observation_text(&text),
            Err(CoreError::Validation(_))
        );
    }
}
