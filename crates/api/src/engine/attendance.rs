use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use rollbook_core::attendance::{
    normalize_observation_text, validate_id, validate_record_date, AttendanceKey,
    AttendanceRecord, AttendanceStatus, BulkEntryFailure, BulkSetResult, Observation,
};
use rollbook_core::error::{CoreError, CoreResult};
use rollbook_core::period::{DateRange, WeekStart};
use rollbook_core::scope::{AuthorizedRooms, RequestContext, Room, RoomFilter, Student};
use rollbook_core::stats::{student_history, StudentHistory};
use rollbook_core::types::{Date, DbId};
use rollbook_events::{ChangeEvent, ChangeKind, EventBus};
use serde::{Deserialize, Serialize};

use super::report::{build_report, ReportSummary};
use super::Stores;

/// Maximum number of entries accepted by one bulk write.
pub const MAX_BULK_ENTRIES: usize = 500;

/// Default and maximum result size for student search.
const DEFAULT_SEARCH_LIMIT: i64 = 20;
const MAX_SEARCH_LIMIT: i64 = 100;

/// One `(student, status)` pair of a bulk write. The status stays a string
/// so a malformed value fails only its own entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkEntry {
    pub student_id: DbId,
    pub status: String,
}

/// A row of the "taking attendance" list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub student_id: DbId,
    pub student_name: String,
    pub status: Option<AttendanceStatus>,
    pub observation: Option<String>,
}

/// Authorization-checked attendance, observation and reporting operations.
pub struct AttendanceEngine {
    stores: Stores,
    event_bus: Arc<EventBus>,
    week_start: WeekStart,
    max_range_days: u64,
}

impl AttendanceEngine {
    pub fn new(
        stores: Stores,
        event_bus: Arc<EventBus>,
        week_start: WeekStart,
        max_range_days: u64,
    ) -> Self {
        Self {
            stores,
            event_bus,
            week_start,
            max_range_days,
        }
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    // -----------------------------------------------------------------------
    // Scoping
    // -----------------------------------------------------------------------

    /// Rooms the caller holds a grant for that are active in their company.
    /// Recomputed on every call.
    pub async fn authorized_rooms(&self, ctx: &RequestContext) -> CoreResult<AuthorizedRooms> {
        let rooms = self.stores.catalog.list_rooms(ctx.company_id).await?;
        let granted = self
            .stores
            .catalog
            .granted_room_ids(ctx.company_id, ctx.user_id)
            .await?;
        Ok(AuthorizedRooms::resolve(ctx.company_id, &granted, &rooms))
    }

    pub async fn can_access(&self, ctx: &RequestContext, room_id: DbId) -> CoreResult<bool> {
        Ok(self.authorized_rooms(ctx).await?.contains(room_id))
    }

    /// Whether the student belongs to at least one room the caller may access.
    pub async fn can_access_student(&self, ctx: &RequestContext, student_id: DbId) -> CoreResult<bool> {
        let authorized = self.authorized_rooms(ctx).await?;
        Ok(self
            .stores
            .catalog
            .student_room_ids(ctx.company_id, student_id)
            .await?
            .into_iter()
            .any(|room_id| authorized.contains(room_id)))
    }

    /// Authorized rooms with their names, ordered by name.
    pub async fn list_authorized_rooms(&self, ctx: &RequestContext) -> CoreResult<Vec<Room>> {
        let authorized = self.authorized_rooms(ctx).await?;
        let mut rooms: Vec<Room> = self
            .stores
            .catalog
            .list_rooms(ctx.company_id)
            .await?
            .into_iter()
            .filter(|r| authorized.contains(r.id))
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rooms)
    }

    async fn require_room(&self, ctx: &RequestContext, room_id: DbId) -> CoreResult<AuthorizedRooms> {
        validate_id(room_id, "room_id")?;
        let authorized = self.authorized_rooms(ctx).await?;
        if let Err(e) = authorized.require(room_id) {
            tracing::warn!(
                company_id = ctx.company_id,
                user_id = ctx.user_id,
                room_id,
                "Room access denied"
            );
            return Err(e);
        }
        Ok(authorized)
    }

    async fn member_ids(&self, ctx: &RequestContext, room_ids: &[DbId]) -> CoreResult<BTreeSet<DbId>> {
        Ok(self
            .stores
            .catalog
            .list_members(ctx.company_id, room_ids)
            .await?
            .into_iter()
            .map(|m| m.student_id)
            .collect())
    }

    /// The student's rooms that the caller is authorized for.
    ///
    /// `NotFound` when the student does not exist in the caller's company,
    /// `Forbidden` when none of the student's rooms is authorized.
    async fn student_scope(&self, ctx: &RequestContext, student_id: DbId) -> CoreResult<Vec<DbId>> {
        validate_id(student_id, "student_id")?;
        if self
            .stores
            .catalog
            .find_student(ctx.company_id, student_id)
            .await?
            .is_none()
        {
            return Err(CoreError::NotFound {
                entity: "Student",
                id: student_id,
            });
        }
        let authorized = self.authorized_rooms(ctx).await?;
        let rooms: Vec<DbId> = self
            .stores
            .catalog
            .student_room_ids(ctx.company_id, student_id)
            .await?
            .into_iter()
            .filter(|room_id| authorized.contains(*room_id))
            .collect();
        if rooms.is_empty() {
            return Err(CoreError::Forbidden(format!(
                "Student {student_id} is not in any room you can access"
            )));
        }
        Ok(rooms)
    }

    fn check_range(&self, range: &DateRange) -> CoreResult<()> {
        validate_record_date(range.from)?;
        validate_record_date(range.to)?;
        range.ensure_max_days(self.max_range_days)
    }

    fn publish(&self, ctx: &RequestContext, event: ChangeEvent) {
        self.event_bus.publish(event.with_actor(ctx.user_id));
    }

    // -----------------------------------------------------------------------
    // Attendance writes
    // -----------------------------------------------------------------------

    /// Record a status, replacing any previous one for the same key.
    pub async fn set_status(
        &self,
        ctx: &RequestContext,
        room_id: DbId,
        student_id: DbId,
        date: Date,
        status: AttendanceStatus,
    ) -> CoreResult<AttendanceRecord> {
        let key = AttendanceKey::new(ctx.company_id, room_id, student_id, date);
        key.validate()?;
        self.require_room(ctx, room_id).await?;

        let rooms = self
            .stores
            .catalog
            .student_room_ids(ctx.company_id, student_id)
            .await?;
        if !rooms.contains(&room_id) {
            return Err(not_a_member(student_id, room_id));
        }

        let record = self.stores.attendance.upsert_status(key, status).await?;

        tracing::info!(
            company_id = ctx.company_id,
            user_id = ctx.user_id,
            room_id,
            student_id,
            date = %date,
            status = status.as_str(),
            "Attendance status set"
        );
        self.publish(
            ctx,
            ChangeEvent::new(ChangeKind::AttendanceSet, ctx.company_id, date)
                .in_room(room_id)
                .for_student(student_id),
        );
        Ok(record)
    }

    /// Apply many status writes for one room and day.
    ///
    /// Authorization is checked once for the whole batch. After that each
    /// entry commits on its own and failures are reported per student.
    pub async fn bulk_set_status(
        &self,
        ctx: &RequestContext,
        room_id: DbId,
        date: Date,
        entries: &[BulkEntry],
    ) -> CoreResult<BulkSetResult> {
        validate_record_date(date)?;
        if entries.is_empty() {
            return Err(CoreError::Validation("entries must not be empty".into()));
        }
        if entries.len() > MAX_BULK_ENTRIES {
            return Err(CoreError::Validation(format!(
                "Cannot set more than {MAX_BULK_ENTRIES} entries at once"
            )));
        }
        self.require_room(ctx, room_id).await?;
        let members = self.member_ids(ctx, &[room_id]).await?;

        let mut result = BulkSetResult::default();
        for entry in entries {
            match self.apply_bulk_entry(ctx, room_id, date, entry, &members).await {
                Ok(()) => result.succeeded.push(entry.student_id),
                Err(e) => {
                    tracing::warn!(
                        room_id,
                        student_id = entry.student_id,
                        error = %e,
                        "Bulk attendance entry failed"
                    );
                    result.failed.push(BulkEntryFailure {
                        student_id: entry.student_id,
                        code: e.code(),
                        error: e.client_message(),
                    });
                }
            }
        }

        tracing::info!(
            company_id = ctx.company_id,
            user_id = ctx.user_id,
            room_id,
            date = %date,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Bulk attendance applied"
        );
        if !result.succeeded.is_empty() {
            self.publish(
                ctx,
                ChangeEvent::new(ChangeKind::AttendanceSet, ctx.company_id, date).in_room(room_id),
            );
        }
        Ok(result)
    }

    async fn apply_bulk_entry(
        &self,
        ctx: &RequestContext,
        room_id: DbId,
        date: Date,
        entry: &BulkEntry,
        members: &BTreeSet<DbId>,
    ) -> CoreResult<()> {
        let status = AttendanceStatus::from_str_value(&entry.status)?;
        let key = AttendanceKey::new(ctx.company_id, room_id, entry.student_id, date);
        key.validate()?;
        if !members.contains(&entry.student_id) {
            return Err(not_a_member(entry.student_id, room_id));
        }
        self.stores.attendance.upsert_status(key, status).await?;
        Ok(())
    }

    /// Remove one record. Returns whether a record existed.
    pub async fn clear_status(
        &self,
        ctx: &RequestContext,
        room_id: DbId,
        student_id: DbId,
        date: Date,
    ) -> CoreResult<bool> {
        let key = AttendanceKey::new(ctx.company_id, room_id, student_id, date);
        key.validate()?;
        self.require_room(ctx, room_id).await?;

        let removed = self.stores.attendance.delete_status(key).await?;
        if removed {
            tracing::info!(room_id, student_id, date = %date, "Attendance status cleared");
            self.publish(
                ctx,
                ChangeEvent::new(ChangeKind::AttendanceCleared, ctx.company_id, date)
                    .in_room(room_id)
                    .for_student(student_id),
            );
        }
        Ok(removed)
    }

    /// Delete every record of a room on a date. Idempotent.
    pub async fn cancel_day(&self, ctx: &RequestContext, room_id: DbId, date: Date) -> CoreResult<u64> {
        validate_record_date(date)?;
        self.require_room(ctx, room_id).await?;

        let removed = self
            .stores
            .attendance
            .delete_day(ctx.company_id, room_id, date)
            .await?;
        tracing::info!(
            company_id = ctx.company_id,
            user_id = ctx.user_id,
            room_id,
            date = %date,
            removed,
            "Attendance day cancelled"
        );
        if removed > 0 {
            self.publish(
                ctx,
                ChangeEvent::new(ChangeKind::DayCancelled, ctx.company_id, date).in_room(room_id),
            );
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Attendance reads
    // -----------------------------------------------------------------------

    pub async fn get_for_day(
        &self,
        ctx: &RequestContext,
        room_id: DbId,
        date: Date,
    ) -> CoreResult<BTreeMap<DbId, AttendanceStatus>> {
        validate_record_date(date)?;
        self.require_room(ctx, room_id).await?;
        let records = self
            .stores
            .attendance
            .list_day(ctx.company_id, room_id, date)
            .await?;
        Ok(records.into_iter().map(|r| (r.student_id, r.status)).collect())
    }

    /// Records in `range` for one authorized room or all of them.
    pub async fn get_for_range(
        &self,
        ctx: &RequestContext,
        filter: RoomFilter,
        range: DateRange,
    ) -> CoreResult<Vec<AttendanceRecord>> {
        self.check_range(&range)?;
        let room_ids = self.scope_rooms(ctx, filter).await?;
        if room_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.stores
            .attendance
            .list_range(ctx.company_id, &room_ids, range)
            .await
    }

    async fn scope_rooms(&self, ctx: &RequestContext, filter: RoomFilter) -> CoreResult<Vec<DbId>> {
        if let RoomFilter::Single(room_id) = filter {
            self.require_room(ctx, room_id).await?;
            return Ok(vec![room_id]);
        }
        self.authorized_rooms(ctx).await?.rooms_for(filter)
    }

    /// Active members of a room joined with the day's status and observation.
    pub async fn room_roster(
        &self,
        ctx: &RequestContext,
        room_id: DbId,
        date: Date,
    ) -> CoreResult<Vec<RosterEntry>> {
        validate_record_date(date)?;
        self.require_room(ctx, room_id).await?;

        let members: Vec<_> = self
            .stores
            .catalog
            .list_members(ctx.company_id, &[room_id])
            .await?
            .into_iter()
            .filter(|m| m.is_active)
            .collect();
        let statuses: HashMap<DbId, AttendanceStatus> = self
            .stores
            .attendance
            .list_day(ctx.company_id, room_id, date)
            .await?
            .into_iter()
            .map(|r| (r.student_id, r.status))
            .collect();
        let student_ids: Vec<DbId> = members.iter().map(|m| m.student_id).collect();
        let mut notes: HashMap<DbId, String> = self
            .stores
            .observations
            .list_observations(ctx.company_id, &student_ids, date)
            .await?
            .into_iter()
            .map(|o| (o.student_id, o.text))
            .collect();

        let mut roster: Vec<RosterEntry> = members
            .into_iter()
            .map(|m| RosterEntry {
                status: statuses.get(&m.student_id).copied(),
                observation: notes.remove(&m.student_id),
                student_id: m.student_id,
                student_name: m.student_name,
            })
            .collect();
        roster.sort_by(|a, b| a.student_name.cmp(&b.student_name).then(a.student_id.cmp(&b.student_id)));
        Ok(roster)
    }

    // -----------------------------------------------------------------------
    // Observations
    // -----------------------------------------------------------------------

    /// Store a note, replacing any previous one. Blank text clears it and
    /// returns `None`.
    pub async fn set_observation(
        &self,
        ctx: &RequestContext,
        student_id: DbId,
        date: Date,
        text: &str,
    ) -> CoreResult<Option<Observation>> {
        validate_record_date(date)?;
        let text = normalize_observation_text(text)?;
        self.student_scope(ctx, student_id).await?;

        match text {
            Some(text) => {
                let observation = self
                    .stores
                    .observations
                    .upsert_observation(ctx.company_id, student_id, date, &text)
                    .await?;
                tracing::info!(student_id, date = %date, "Observation set");
                self.publish(
                    ctx,
                    ChangeEvent::new(ChangeKind::ObservationSet, ctx.company_id, date)
                        .for_student(student_id),
                );
                Ok(Some(observation))
            }
            None => {
                let removed = self
                    .stores
                    .observations
                    .delete_observation(ctx.company_id, student_id, date)
                    .await?;
                if removed {
                    tracing::info!(student_id, date = %date, "Observation cleared");
                    self.publish(
                        ctx,
                        ChangeEvent::new(ChangeKind::ObservationCleared, ctx.company_id, date)
                            .for_student(student_id),
                    );
                }
                Ok(None)
            }
        }
    }

    /// Notes on `date` for students in one authorized room or all of them.
    pub async fn get_observations_for_day(
        &self,
        ctx: &RequestContext,
        filter: RoomFilter,
        date: Date,
    ) -> CoreResult<BTreeMap<DbId, String>> {
        validate_record_date(date)?;
        let room_ids = self.scope_rooms(ctx, filter).await?;
        if room_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let student_ids: Vec<DbId> = self.member_ids(ctx, &room_ids).await?.into_iter().collect();
        let observations = self
            .stores
            .observations
            .list_observations(ctx.company_id, &student_ids, date)
            .await?;
        Ok(observations.into_iter().map(|o| (o.student_id, o.text)).collect())
    }

    /// Delete the notes on `date` of every member of a room. Idempotent.
    pub async fn cancel_observations_for_day(
        &self,
        ctx: &RequestContext,
        room_id: DbId,
        date: Date,
    ) -> CoreResult<u64> {
        validate_record_date(date)?;
        self.require_room(ctx, room_id).await?;
        let student_ids: Vec<DbId> = self.member_ids(ctx, &[room_id]).await?.into_iter().collect();

        let removed = self
            .stores
            .observations
            .delete_observations(ctx.company_id, &student_ids, date)
            .await?;
        tracing::info!(room_id, date = %date, removed, "Observations cancelled for day");
        if removed > 0 {
            self.publish(
                ctx,
                ChangeEvent::new(ChangeKind::ObservationsCancelled, ctx.company_id, date)
                    .in_room(room_id),
            );
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Students and reports
    // -----------------------------------------------------------------------

    /// Case-insensitive name search over students of the caller's rooms.
    pub async fn search_students(
        &self,
        ctx: &RequestContext,
        query: &str,
        limit: Option<i64>,
    ) -> CoreResult<Vec<Student>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::Validation("search query must not be empty".into()));
        }
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);
        let room_ids = self.authorized_rooms(ctx).await?.ids();
        if room_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.stores
            .catalog
            .search_students(ctx.company_id, &room_ids, query, limit)
            .await
    }

    /// One student's records in the caller's authorized rooms.
    pub async fn student_history(
        &self,
        ctx: &RequestContext,
        student_id: DbId,
        range: DateRange,
    ) -> CoreResult<StudentHistory> {
        self.check_range(&range)?;
        let room_ids = self.student_scope(ctx, student_id).await?;
        let records = self
            .stores
            .attendance
            .list_student_range(ctx.company_id, student_id, &room_ids, range)
            .await?;
        Ok(student_history(student_id, range, &records))
    }

    /// Per-date series, totals and per-room breakdown for a scope.
    pub async fn report_summary(
        &self,
        ctx: &RequestContext,
        filter: RoomFilter,
        range: DateRange,
    ) -> CoreResult<ReportSummary> {
        self.check_range(&range)?;
        let room_ids = self.scope_rooms(ctx, filter).await?;
        let rooms: Vec<Room> = self
            .stores
            .catalog
            .list_rooms(ctx.company_id)
            .await?
            .into_iter()
            .filter(|r| room_ids.contains(&r.id))
            .collect();
        if rooms.is_empty() {
            return Ok(build_report(range, &[], &[], &[]));
        }
        let members = self.stores.catalog.list_members(ctx.company_id, &room_ids).await?;
        let records = self
            .stores
            .attendance
            .list_range(ctx.company_id, &room_ids, range)
            .await?;
        Ok(build_report(range, &rooms, &members, &records))
    }
}

fn not_a_member(student_id: DbId, room_id: DbId) -> CoreError {
    CoreError::Validation(format!(
        "Student {student_id} is not a member of room {room_id}"
    ))
}
