//! Attendance aggregation.
//!
//! Pure functions over pre-loaded, already-scoped records. Nothing here
//! touches storage or performs authorization; the caller resolves the scope
//! first. Empty input always yields zeroed, defined statistics.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::attendance::{AttendanceRecord, AttendanceStatus};
use crate::period::DateRange;
use crate::scope::Room;
use crate::types::{Date, DbId};

// ---------------------------------------------------------------------------
// StatusCounts
// ---------------------------------------------------------------------------

/// Number of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    pub justified: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Justified => self.justified += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.present + self.absent + self.late + self.justified
    }

    pub fn attendance_rate(&self) -> f64 {
        attendance_rate(self.present, self.total())
    }
}

impl<'a> FromIterator<&'a AttendanceRecord> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = &'a AttendanceRecord>>(iter: I) -> Self {
        let mut counts = Self::default();
        for r in iter {
            counts.record(r.status);
        }
        counts
    }
}

/// `present / total * 100`, rounded to two decimals. Zero events yield `0.0`.
pub fn attendance_rate(present: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = present as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Per-date breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateBreakdown {
    pub date: Date,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

/// One entry per date that has at least one record, in chronological order.
pub fn per_date_breakdown(records: &[AttendanceRecord]) -> Vec<DateBreakdown> {
    let mut by_date: BTreeMap<Date, StatusCounts> = BTreeMap::new();
    for r in records {
        by_date.entry(r.date).or_default().record(r.status);
    }
    by_date
        .into_iter()
        .map(|(date, counts)| DateBreakdown { date, counts })
        .collect()
}

// ---------------------------------------------------------------------------
// Scope totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeTotals {
    pub total_students: u64,
    pub total_rooms: u64,
    pub total_records: u64,
    pub counts: StatusCounts,
    pub attendance_rate: f64,
}

/// Scope-wide totals. `room_ids` and `student_ids` are the rooms and
/// students in scope; duplicates are counted once.
pub fn scope_totals(records: &[AttendanceRecord], room_ids: &[DbId], student_ids: &[DbId]) -> ScopeTotals {
    let counts: StatusCounts = records.iter().collect();
    let rooms: BTreeSet<DbId> = room_ids.iter().copied().collect();
    let students: BTreeSet<DbId> = student_ids.iter().copied().collect();
    ScopeTotals {
        total_students: students.len() as u64,
        total_rooms: rooms.len() as u64,
        total_records: counts.total(),
        counts,
        attendance_rate: counts.attendance_rate(),
    }
}

// ---------------------------------------------------------------------------
// Per-room breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomBreakdown {
    pub room_id: DbId,
    pub room_name: String,
    pub counts: StatusCounts,
    pub attendance_rate: f64,
}

/// Status counts for each room in `rooms`, ordered by room name.
///
/// Rooms with no records are included with zero counts; records for rooms
/// not listed are ignored.
pub fn per_room_breakdown(records: &[AttendanceRecord], rooms: &[Room]) -> Vec<RoomBreakdown> {
    let mut by_room: BTreeMap<DbId, StatusCounts> = BTreeMap::new();
    for r in records {
        by_room.entry(r.room_id).or_default().record(r.status);
    }
    let mut rows: Vec<RoomBreakdown> = rooms
        .iter()
        .map(|room| {
            let counts = by_room.get(&room.id).copied().unwrap_or_default();
            RoomBreakdown {
                room_id: room.id,
                room_name: room.name.clone(),
                counts,
                attendance_rate: counts.attendance_rate(),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.room_name.cmp(&b.room_name).then(a.room_id.cmp(&b.room_id)));
    rows
}

// ---------------------------------------------------------------------------
// Student history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentHistory {
    pub student_id: DbId,
    pub range: DateRange,
    pub counts: StatusCounts,
    pub attendance_rate: f64,
    pub records: Vec<AttendanceRecord>,
}

/// Summarize one student's records inside `range`, ordered by date then room.
pub fn student_history(student_id: DbId, range: DateRange, records: &[AttendanceRecord]) -> StudentHistory {
    let mut own: Vec<AttendanceRecord> = records
        .iter()
        .filter(|r| r.student_id == student_id && range.contains(r.date))
        .cloned()
        .collect();
    own.sort_by(|a, b| a.date.cmp(&b.date).then(a.room_id.cmp(&b.room_id)));
    let counts: StatusCounts = own.iter().collect();
    StudentHistory {
        student_id,
        range,
        counts,
        attendance_rate: counts.attendance_rate(),
        records: own,
    }
}
