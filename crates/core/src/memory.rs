//! In-process storage backend.
//!
//! Keeps the catalog and attendance state in keyed maps behind a single
//! `tokio::sync::RwLock`. A status write is one map insert under the write
//! lock, so concurrent writers to the same identity key can never produce
//! two records. Used for development (`STORAGE_BACKEND=memory`) and tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::attendance::{AttendanceKey, AttendanceRecord, AttendanceStatus, Observation};
use crate::error::{CoreError, CoreResult};
use crate::period::DateRange;
use crate::scope::{Room, RoomMember, Student};
use crate::store::{AttendanceStore, CatalogStore, ObservationStore};
use crate::types::{Date, DbId};

type ObservationKey = (DbId, DbId, Date);

#[derive(Default)]
struct MemoryState {
    rooms: BTreeMap<DbId, Room>,
    students: BTreeMap<DbId, Student>,
    /// `(room_id, student_id)` enrollments.
    members: BTreeSet<(DbId, DbId)>,
    /// `(company_id, user_id, room_id)` grants.
    grants: BTreeSet<(DbId, DbId, DbId)>,
    attendance: HashMap<AttendanceKey, AttendanceRecord>,
    observations: HashMap<ObservationKey, Observation>,
}

/// Thread-safe in-memory implementation of every storage trait.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Catalog seeding
    // -----------------------------------------------------------------------

    pub async fn add_room(&self, company_id: DbId, room_id: DbId, name: &str) {
        self.state.write().await.rooms.insert(
            room_id,
            Room {
                id: room_id,
                company_id,
                name: name.to_string(),
                is_active: true,
            },
        );
    }

    pub async fn set_room_active(&self, room_id: DbId, is_active: bool) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let room = state.rooms.get_mut(&room_id).ok_or(CoreError::NotFound {
            entity: "Room",
            id: room_id,
        })?;
        room.is_active = is_active;
        Ok(())
    }

    pub async fn add_student(&self, company_id: DbId, student_id: DbId, name: &str) {
        self.state.write().await.students.insert(
            student_id,
            Student {
                id: student_id,
                company_id,
                name: name.to_string(),
                is_active: true,
            },
        );
    }

    pub async fn enroll(&self, room_id: DbId, student_id: DbId) {
        self.state.write().await.members.insert((room_id, student_id));
    }

    pub async fn grant(&self, company_id: DbId, user_id: DbId, room_id: DbId) {
        self.state
            .write()
            .await
            .grants
            .insert((company_id, user_id, room_id));
    }

    /// Number of attendance records across all companies.
    pub async fn attendance_count(&self) -> usize {
        self.state.read().await.attendance.len()
    }
}

fn room_in_company(state: &MemoryState, company_id: DbId, room_id: DbId) -> bool {
    state
        .rooms
        .get(&room_id)
        .is_some_and(|r| r.company_id == company_id)
}

fn student_in_company(state: &MemoryState, company_id: DbId, student_id: DbId) -> bool {
    state
        .students
        .get(&student_id)
        .is_some_and(|s| s.company_id == company_id)
}

fn sort_records(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.room_id.cmp(&b.room_id))
            .then(a.student_id.cmp(&b.student_id))
    });
}

// ---------------------------------------------------------------------------
// CatalogStore
// ---------------------------------------------------------------------------

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_rooms(&self, company_id: DbId) -> CoreResult<Vec<Room>> {
        let state = self.state.read().await;
        Ok(state
            .rooms
            .values()
            .filter(|r| r.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn granted_room_ids(&self, company_id: DbId, user_id: DbId) -> CoreResult<Vec<DbId>> {
        let state = self.state.read().await;
        Ok(state
            .grants
            .iter()
            .filter(|(c, u, _)| *c == company_id && *u == user_id)
            .map(|(_, _, room_id)| *room_id)
            .collect())
    }

    async fn list_members(&self, company_id: DbId, room_ids: &[DbId]) -> CoreResult<Vec<RoomMember>> {
        let state = self.state.read().await;
        let mut members: Vec<RoomMember> = state
            .members
            .iter()
            .filter(|(room_id, _)| {
                room_ids.contains(room_id) && room_in_company(&state, company_id, *room_id)
            })
            .filter_map(|(room_id, student_id)| {
                let student = state.students.get(student_id)?;
                (student.company_id == company_id).then(|| RoomMember {
                    room_id: *room_id,
                    student_id: student.id,
                    student_name: student.name.clone(),
                    is_active: student.is_active,
                })
            })
            .collect();
        members.sort_by(|a, b| {
            a.room_id
                .cmp(&b.room_id)
                .then(a.student_name.cmp(&b.student_name))
                .then(a.student_id.cmp(&b.student_id))
        });
        Ok(members)
    }

    async fn find_student(&self, company_id: DbId, student_id: DbId) -> CoreResult<Option<Student>> {
        let state = self.state.read().await;
        Ok(state
            .students
            .get(&student_id)
            .filter(|s| s.company_id == company_id)
            .cloned())
    }

    async fn student_room_ids(&self, company_id: DbId, student_id: DbId) -> CoreResult<Vec<DbId>> {
        let state = self.state.read().await;
        if !student_in_company(&state, company_id, student_id) {
            return Ok(Vec::new());
        }
        Ok(state
            .members
            .iter()
            .filter(|(room_id, s)| *s == student_id && room_in_company(&state, company_id, *room_id))
            .map(|(room_id, _)| *room_id)
            .collect())
    }

    async fn search_students(
        &self,
        company_id: DbId,
        room_ids: &[DbId],
        query: &str,
        limit: i64,
    ) -> CoreResult<Vec<Student>> {
        let state = self.state.read().await;
        let needle = query.to_lowercase();
        let in_scope: BTreeSet<DbId> = state
            .members
            .iter()
            .filter(|(room_id, _)| room_ids.contains(room_id))
            .map(|(_, student_id)| *student_id)
            .collect();
        let mut found: Vec<Student> = state
            .students
            .values()
            .filter(|s| s.company_id == company_id && in_scope.contains(&s.id))
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// AttendanceStore
// ---------------------------------------------------------------------------

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn upsert_status(&self, key: AttendanceKey, status: AttendanceStatus) -> CoreResult<AttendanceRecord> {
        let record = AttendanceRecord {
            company_id: key.company_id,
            room_id: key.room_id,
            student_id: key.student_id,
            date: key.date,
            status,
            updated_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .attendance
            .insert(key, record.clone());
        Ok(record)
    }

    async fn delete_status(&self, key: AttendanceKey) -> CoreResult<bool> {
        Ok(self.state.write().await.attendance.remove(&key).is_some())
    }

    async fn delete_day(&self, company_id: DbId, room_id: DbId, date: Date) -> CoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.attendance.len();
        state
            .attendance
            .retain(|k, _| !(k.company_id == company_id && k.room_id == room_id && k.date == date));
        Ok((before - state.attendance.len()) as u64)
    }

    async fn list_day(&self, company_id: DbId, room_id: DbId, date: Date) -> CoreResult<Vec<AttendanceRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<AttendanceRecord> = state
            .attendance
            .values()
            .filter(|r| r.company_id == company_id && r.room_id == room_id && r.date == date)
            .cloned()
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    async fn list_range(
        &self,
        company_id: DbId,
        room_ids: &[DbId],
        range: DateRange,
    ) -> CoreResult<Vec<AttendanceRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<AttendanceRecord> = state
            .attendance
            .values()
            .filter(|r| {
                r.company_id == company_id && room_ids.contains(&r.room_id) && range.contains(r.date)
            })
            .cloned()
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    async fn list_student_range(
        &self,
        company_id: DbId,
        student_id: DbId,
        room_ids: &[DbId],
        range: DateRange,
    ) -> CoreResult<Vec<AttendanceRecord>> {
        let mut records = self.list_range(company_id, room_ids, range).await?;
        records.retain(|r| r.student_id == student_id);
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// ObservationStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ObservationStore for MemoryStore {
    async fn upsert_observation(
        &self,
        company_id: DbId,
        student_id: DbId,
        date: Date,
        text: &str,
    ) -> CoreResult<Observation> {
        let observation = Observation {
            company_id,
            student_id,
            date,
            text: text.to_string(),
            updated_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .observations
            .insert((company_id, student_id, date), observation.clone());
        Ok(observation)
    }

    async fn delete_observation(&self, company_id: DbId, student_id: DbId, date: Date) -> CoreResult<bool> {
        Ok(self
            .state
            .write()
            .await
            .observations
            .remove(&(company_id, student_id, date))
            .is_some())
    }

    async fn delete_observations(&self, company_id: DbId, student_ids: &[DbId], date: Date) -> CoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.observations.len();
        state
            .observations
            .retain(|(c, s, d), _| !(*c == company_id && *d == date && student_ids.contains(s)));
        Ok((before - state.observations.len()) as u64)
    }

    async fn list_observations(
        &self,
        company_id: DbId,
        student_ids: &[DbId],
        date: Date,
    ) -> CoreResult<Vec<Observation>> {
        let state = self.state.read().await;
        let mut found: Vec<Observation> = state
            .observations
            .values()
            .filter(|o| o.company_id == company_id && o.date == date && student_ids.contains(&o.student_id))
            .cloned()
            .collect();
        found.sort_by_key(|o| o.student_id);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_room(1, 10, "Room A").await;
        store.add_room(2, 20, "Other company").await;
        store.add_student(1, 100, "Ana").await;
        store.add_student(1, 101, "bruno").await;
        store.add_student(2, 200, "Carla").await;
        store.enroll(10, 100).await;
        store.enroll(10, 101).await;
        store.enroll(20, 200).await;
        store
    }

    #[tokio::test]
    async fn upsert_replaces_existing_record() {
        let store = seeded().await;
        let key = AttendanceKey::new(1, 10, 100, d(2024, 1, 10));

        store.upsert_status(key, AttendanceStatus::Late).await.unwrap();
        store.upsert_status(key, AttendanceStatus::Present).await.unwrap();

        let day = store.list_day(1, 10, d(2024, 1, 10)).await.unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn concurrent_upserts_keep_one_record() {
        let store = Arc::new(seeded().await);
        let key = AttendanceKey::new(1, 10, 100, d(2024, 1, 10));

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            let status = AttendanceStatus::ALL[i % 4];
            handles.push(tokio::spawn(async move { store.upsert_status(key, status).await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(store.attendance_count().await, 1);
    }

    #[tokio::test]
    async fn delete_day_is_scoped_to_room_and_date() {
        let store = seeded().await;
        let day = d(2024, 1, 10);
        store
            .upsert_status(AttendanceKey::new(1, 10, 100, day), AttendanceStatus::Present)
            .await
            .unwrap();
        store
            .upsert_status(AttendanceKey::new(1, 10, 100, d(2024, 1, 11)), AttendanceStatus::Present)
            .await
            .unwrap();

        assert_eq!(store.delete_day(1, 10, day).await.unwrap(), 1);
        assert_eq!(store.delete_day(1, 10, day).await.unwrap(), 0);
        assert_eq!(store.attendance_count().await, 1);
    }

    #[tokio::test]
    async fn list_range_never_crosses_companies() {
        let store = seeded().await;
        let day = d(2024, 1, 10);
        store
            .upsert_status(AttendanceKey::new(2, 20, 200, day), AttendanceStatus::Absent)
            .await
            .unwrap();

        let records = store.list_range(1, &[10, 20], DateRange::day(day)).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn members_are_sorted_by_name_within_room() {
        let store = seeded().await;
        store.add_student(1, 102, "Aaron").await;
        store.enroll(10, 102).await;

        let members = store.list_members(1, &[10]).await.unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.student_name.as_str()).collect();
        assert_eq!(names, vec!["Aaron", "Ana", "bruno"]);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_room_scoped() {
        let store = seeded().await;

        let found = store.search_students(1, &[10], "BRU", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 101);

        let none = store.search_students(1, &[], "a", 10).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn observations_replace_and_clear() {
        let store = seeded().await;
        let day = d(2024, 1, 10);
        store.upsert_observation(1, 100, day, "first").await.unwrap();
        store.upsert_observation(1, 100, day, "second").await.unwrap();

        let notes = store.list_observations(1, &[100, 101], day).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "second");

        assert!(store.delete_observation(1, 100, day).await.unwrap());
        assert!(!store.delete_observation(1, 100, day).await.unwrap());
    }
}
