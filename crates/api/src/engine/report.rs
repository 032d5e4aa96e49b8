//! Report composition: the per-date series, scope totals and per-room
//! breakdown of one scope, computed from pre-loaded rows.

use std::collections::BTreeSet;

use rollbook_core::attendance::AttendanceRecord;
use rollbook_core::period::DateRange;
use rollbook_core::scope::{Room, RoomMember};
use rollbook_core::stats::{
    per_date_breakdown, per_room_breakdown, scope_totals, DateBreakdown, RoomBreakdown,
    ScopeTotals,
};
use rollbook_core::types::DbId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub range: DateRange,
    /// Rooms the report covers, ascending.
    pub room_ids: Vec<DbId>,
    pub per_date: Vec<DateBreakdown>,
    pub totals: ScopeTotals,
    pub per_room: Vec<RoomBreakdown>,
}

/// Build a report. `rooms`, `members` and `records` must already be
/// restricted to the scope.
///
/// Students counted are the active members of the scoped rooms plus anyone
/// with a record in range, so a student who left a room still counts for
/// the days they attended.
pub fn build_report(
    range: DateRange,
    rooms: &[Room],
    members: &[RoomMember],
    records: &[AttendanceRecord],
) -> ReportSummary {
    let mut room_ids: Vec<DbId> = rooms.iter().map(|r| r.id).collect();
    room_ids.sort_unstable();
    room_ids.dedup();
    let student_ids: Vec<DbId> = members
        .iter()
        .filter(|m| m.is_active)
        .map(|m| m.student_id)
        .chain(records.iter().map(|r| r.student_id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    ReportSummary {
        range,
        per_date: per_date_breakdown(records),
        totals: scope_totals(records, &room_ids, &student_ids),
        room_ids,
        per_room: per_room_breakdown(records, rooms),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rollbook_core::attendance::AttendanceStatus;
    use rollbook_core::types::Date;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn room(id: DbId, name: &str) -> Room {
        Room {
            id,
            company_id: 1,
            name: name.into(),
            is_active: true,
        }
    }

    fn member(room_id: DbId, student_id: DbId) -> RoomMember {
        RoomMember {
            room_id,
            student_id,
            student_name: format!("Student {student_id}"),
            is_active: true,
        }
    }

    fn rec(room_id: DbId, student_id: DbId, date: Date, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            company_id: 1,
            room_id,
            student_id,
            date,
            status,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_scope_reports_zero_rate() {
        let range = DateRange::day(d(2024, 1, 10));
        let report = build_report(range, &[room(1, "A")], &[member(1, 10)], &[]);
        assert!(report.per_date.is_empty());
        assert_eq!(report.totals.attendance_rate, 0.0);
        assert_eq!(report.totals.total_students, 1);
        assert_eq!(report.per_room.len(), 1);
    }

    #[test]
    fn departed_student_with_records_is_counted() {
        let range = DateRange::new(d(2024, 1, 10), d(2024, 1, 11)).unwrap();
        let records = vec![
            rec(1, 10, d(2024, 1, 10), AttendanceStatus::Present),
            rec(1, 11, d(2024, 1, 10), AttendanceStatus::Absent),
        ];
        let report = build_report(range, &[room(1, "A")], &[member(1, 10)], &records);
        assert_eq!(report.totals.total_students, 2);
        assert_eq!(report.totals.total_records, 2);
        assert_eq!(report.totals.attendance_rate, 50.0);
    }
}
