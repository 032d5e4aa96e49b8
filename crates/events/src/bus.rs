//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`ChangeEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the application.
//! Delivery is at-least-once for live subscribers and unordered across
//! publishers; slow subscribers observe `RecvError::Lagged`.

use chrono::Utc;
use rollbook_core::period::DateRange;
use rollbook_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// ChangeEvent
// ---------------------------------------------------------------------------

/// What kind of mutation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    AttendanceSet,
    AttendanceCleared,
    DayCancelled,
    ObservationSet,
    ObservationCleared,
    ObservationsCancelled,
}

impl ChangeKind {
    /// Dot-separated event name, e.g. `"attendance.set"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AttendanceSet => "attendance.set",
            Self::AttendanceCleared => "attendance.cleared",
            Self::DayCancelled => "attendance.day_cancelled",
            Self::ObservationSet => "observation.set",
            Self::ObservationCleared => "observation.cleared",
            Self::ObservationsCancelled => "observation.day_cancelled",
        }
    }

    /// Whether the mutation touched attendance records (as opposed to notes).
    pub fn is_attendance(&self) -> bool {
        matches!(
            self,
            Self::AttendanceSet | Self::AttendanceCleared | Self::DayCancelled
        )
    }
}

/// A storage mutation that may invalidate open views.
///
/// Constructed via [`ChangeEvent::new`] and enriched with
/// [`in_room`](ChangeEvent::in_room), [`for_student`](ChangeEvent::for_student)
/// and [`with_actor`](ChangeEvent::with_actor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub company_id: DbId,
    /// `None` for room-less mutations (single observations).
    pub room_id: Option<DbId>,
    pub student_id: Option<DbId>,
    pub date: Date,
    pub actor_user_id: Option<DbId>,
    pub timestamp: Timestamp,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, company_id: DbId, date: Date) -> Self {
        Self {
            kind,
            company_id,
            room_id: None,
            student_id: None,
            date,
            actor_user_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn in_room(mut self, room_id: DbId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn for_student(mut self, student_id: DbId) -> Self {
        self.student_id = Some(student_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }
}

// ---------------------------------------------------------------------------
// ChangeFilter
// ---------------------------------------------------------------------------

/// Subscription scope: a company, optionally narrowed to rooms and dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub company_id: DbId,
    /// `None` matches any room.
    pub room_ids: Option<Vec<DbId>>,
    /// `None` matches any date.
    pub range: Option<DateRange>,
}

impl ChangeFilter {
    pub fn company(company_id: DbId) -> Self {
        Self {
            company_id,
            room_ids: None,
            range: None,
        }
    }

    pub fn rooms(mut self, room_ids: Vec<DbId>) -> Self {
        self.room_ids = Some(room_ids);
        self
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Whether `event` may affect data in this scope.
    ///
    /// Room-less events match any room filter of the same company.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.company_id != self.company_id {
            return false;
        }
        if let Some(range) = &self.range {
            if !range.contains(event.date) {
                return false;
            }
        }
        match (&self.room_ids, event.room_id) {
            (Some(rooms), Some(room_id)) => rooms.contains(&room_id),
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::trace!(
            event_type = event.kind.event_type(),
            company_id = event.company_id,
            room_id = ?event.room_id,
            "Publishing change event",
        );
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
