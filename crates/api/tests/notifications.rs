//! Change notification routing and live report watches, driven through the
//! engine with in-process WebSocket channels.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::Message;
use common::*;
use rollbook_core::attendance::AttendanceStatus;
use rollbook_core::error::{CoreError, CoreResult};
use rollbook_core::period::DateRange;
use rollbook_core::scope::{RequestContext, Room, RoomFilter, RoomMember, Student};
use rollbook_core::store::CatalogStore;
use rollbook_core::types::{Date, DbId};
use serde_json::Value;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use rollbook_api::notifications::NotificationRouter;
use rollbook_api::ws::WsManager;

const WAIT: Duration = Duration::from_secs(5);

fn d(y: i32, m: u32, day: u32) -> Date {
    Date::from_ymd_opt(y, m, day).unwrap()
}

async fn next_json(rx: &mut UnboundedReceiver<Message>) -> Value {
    let message = timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("channel closed");
    match message {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

fn spawn_router(app: &TestApp) -> tokio::task::JoinHandle<()> {
    let router = NotificationRouter::new(
        Arc::clone(&app.state.engine),
        Arc::clone(&app.state.ws_manager),
        Arc::clone(&app.state.report_watches),
    );
    tokio::spawn(router.run(app.state.event_bus.subscribe()))
}

// ---------------------------------------------------------------------------
// WsManager
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manager_tracks_connections_per_company() {
    let manager = WsManager::new();
    let (_tx1, _rx1) = manager.add("a".into(), RequestContext::new(COMPANY, USER)).await;
    let (_tx2, _rx2) = manager.add("b".into(), RequestContext::new(OTHER_COMPANY, OTHER_USER)).await;

    assert_eq!(manager.connection_count().await, 2);
    assert_eq!(manager.company_connections(COMPANY).await.len(), 1);

    manager.remove("a").await;
    assert_eq!(manager.connection_count().await, 1);
    assert!(manager.company_connections(COMPANY).await.is_empty());
}

#[tokio::test]
async fn shutdown_sends_close_frames() {
    let manager = WsManager::new();
    let (_tx, mut rx) = manager.add("a".into(), RequestContext::new(COMPANY, USER)).await;

    manager.shutdown_all().await;

    assert!(matches!(rx.recv().await, Some(Message::Close(None))));
    assert_eq!(manager.connection_count().await, 0);
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn change_reaches_only_connections_allowed_to_see_the_room() {
    let app = build_test_app().await;
    let _router = spawn_router(&app);
    let manager = &app.state.ws_manager;
    let user_ctx = RequestContext::new(COMPANY, USER);

    let (_tx, mut allowed) = manager.add("allowed".into(), user_ctx).await;
    let (_tx, mut outsider) = manager
        .add("outsider".into(), RequestContext::new(COMPANY, OUTSIDER))
        .await;
    let (_tx, mut foreign) = manager
        .add("foreign".into(), RequestContext::new(OTHER_COMPANY, OTHER_USER))
        .await;

    app.state
        .engine
        .set_status(&user_ctx, ROOM_A, S1, d(2024, 1, 10), AttendanceStatus::Present)
        .await
        .unwrap();
    let frame = next_json(&mut allowed).await;
    assert_eq!(frame["type"], "attendance.changed");
    assert_eq!(frame["event_type"], "attendance.set");
    assert_eq!(frame["room_id"], ROOM_A);
    assert_eq!(frame["date"], "2024-01-10");

    // Events are routed in order, so once the second arrives the first has
    // been offered to every connection.
    app.state
        .engine
        .clear_status(&user_ctx, ROOM_A, S1, d(2024, 1, 10))
        .await
        .unwrap();
    assert_eq!(next_json(&mut allowed).await["event_type"], "attendance.cleared");

    assert_eq!(outsider.try_recv().unwrap_err(), TryRecvError::Empty);
    assert_eq!(foreign.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test]
async fn observation_changes_reach_only_users_who_can_see_the_student() {
    let app = build_test_app().await;
    let _router = spawn_router(&app);
    let manager = &app.state.ws_manager;
    let user_ctx = RequestContext::new(COMPANY, USER);
    let (_tx, mut allowed) = manager.add("allowed".into(), user_ctx).await;
    let (_tx, mut outsider) = manager
        .add("outsider".into(), RequestContext::new(COMPANY, OUTSIDER))
        .await;

    app.state
        .engine
        .set_observation(&user_ctx, S1, d(2024, 1, 10), "late bus")
        .await
        .unwrap();
    let frame = next_json(&mut allowed).await;
    assert_eq!(frame["type"], "observation.changed");
    assert_eq!(frame["event_type"], "observation.set");
    assert!(frame["room_id"].is_null());

    // A second event flushes the first through every connection.
    app.state
        .engine
        .set_observation(&user_ctx, S1, d(2024, 1, 10), "")
        .await
        .unwrap();
    assert_eq!(next_json(&mut allowed).await["event_type"], "observation.cleared");
    assert_eq!(outsider.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test]
async fn observation_on_student_in_other_room_is_not_pushed() {
    let app = build_test_app().await;
    let _router = spawn_router(&app);
    // A second operator of the same company manages room B.
    app.store.grant(COMPANY, OTHER_USER, ROOM_B).await;
    let writer = RequestContext::new(COMPANY, OTHER_USER);
    let user_ctx = RequestContext::new(COMPANY, USER);
    let (_tx, mut user_rx) = app.state.ws_manager.add("user".into(), user_ctx).await;
    let (_tx, mut writer_rx) = app.state.ws_manager.add("writer".into(), writer).await;

    app.state
        .engine
        .set_observation(&writer, S3, d(2024, 1, 10), "new glasses")
        .await
        .unwrap();
    assert_eq!(next_json(&mut writer_rx).await["type"], "observation.changed");
    app.state
        .engine
        .set_status(&user_ctx, ROOM_A, S1, d(2024, 1, 10), AttendanceStatus::Present)
        .await
        .unwrap();

    // The room A write is the only frame the room A user sees.
    assert_eq!(next_json(&mut user_rx).await["type"], "attendance.changed");
    assert_eq!(user_rx.try_recv().unwrap_err(), TryRecvError::Empty);
}

/// Fails grant lookups for one user; everything else goes to the inner store.
struct FailingGrants {
    inner: Arc<dyn CatalogStore>,
    failing_user: DbId,
}

#[async_trait]
impl CatalogStore for FailingGrants {
    async fn list_rooms(&self, company_id: DbId) -> CoreResult<Vec<Room>> {
        self.inner.list_rooms(company_id).await
    }

    async fn granted_room_ids(&self, company_id: DbId, user_id: DbId) -> CoreResult<Vec<DbId>> {
        if user_id == self.failing_user {
            return Err(CoreError::Storage("grant lookup timed out".into()));
        }
        self.inner.granted_room_ids(company_id, user_id).await
    }

    async fn list_members(&self, company_id: DbId, room_ids: &[DbId]) -> CoreResult<Vec<RoomMember>> {
        self.inner.list_members(company_id, room_ids).await
    }

    async fn find_student(&self, company_id: DbId, student_id: DbId) -> CoreResult<Option<Student>> {
        self.inner.find_student(company_id, student_id).await
    }

    async fn student_room_ids(&self, company_id: DbId, student_id: DbId) -> CoreResult<Vec<DbId>> {
        self.inner.student_room_ids(company_id, student_id).await
    }

    async fn search_students(
        &self,
        company_id: DbId,
        room_ids: &[DbId],
        query: &str,
        limit: i64,
    ) -> CoreResult<Vec<Student>> {
        self.inner
            .search_students(company_id, room_ids, query, limit)
            .await
    }
}

#[tokio::test]
async fn visibility_failure_for_one_user_does_not_block_others() {
    let app = build_test_app_with(|mut stores| {
        stores.catalog = Arc::new(FailingGrants {
            inner: stores.catalog.clone(),
            failing_user: OUTSIDER,
        });
        stores
    })
    .await;
    let _router = spawn_router(&app);
    let manager = &app.state.ws_manager;
    let user_ctx = RequestContext::new(COMPANY, USER);

    // Several failing connections so at least one is visited before the
    // healthy one whatever the map order.
    let mut failing = Vec::new();
    for i in 0..4 {
        failing.push(
            manager
                .add(format!("failing-{i}"), RequestContext::new(COMPANY, OUTSIDER))
                .await,
        );
    }
    let (_tx, mut allowed) = manager.add("allowed".into(), user_ctx).await;

    app.state
        .engine
        .set_status(&user_ctx, ROOM_A, S1, d(2024, 1, 10), AttendanceStatus::Late)
        .await
        .unwrap();

    assert_eq!(next_json(&mut allowed).await["event_type"], "attendance.set");
    for (_tx, rx) in &mut failing {
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }
}

// ---------------------------------------------------------------------------
// Report watches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn watch_pushes_initial_report_and_recomputes_after_writes() {
    let app = build_test_app().await;
    let _router = spawn_router(&app);
    let user_ctx = RequestContext::new(COMPANY, USER);
    let (tx, mut rx) = app.state.ws_manager.add("w".into(), user_ctx).await;
    let range = DateRange::new(d(2024, 1, 10), d(2024, 1, 11)).unwrap();

    app.state
        .report_watches
        .start("w", user_ctx, RoomFilter::AllAuthorized, range, Arc::clone(&app.state.engine), tx)
        .await
        .unwrap();

    let initial = next_json(&mut rx).await;
    assert_eq!(initial["type"], "report");
    assert_eq!(initial["data"]["totals"]["total_records"], 0);

    app.state
        .engine
        .set_status(&user_ctx, ROOM_A, S1, d(2024, 1, 10), AttendanceStatus::Present)
        .await
        .unwrap();

    // The change frame and the recomputed report may arrive in either order.
    let mut report = None;
    for _ in 0..2 {
        let frame = next_json(&mut rx).await;
        if frame["type"] == "report" {
            report = Some(frame);
        }
    }
    let report = report.expect("no recomputed report pushed");
    assert_eq!(report["data"]["totals"]["total_records"], 1);
    assert_eq!(report["data"]["totals"]["attendance_rate"], 100.0);

    assert!(app.state.report_watches.stop("w").await);
    assert_eq!(app.state.report_watches.watch_count().await, 0);
}

#[tokio::test]
async fn watch_on_unauthorized_room_fails_up_front() {
    let app = build_test_app().await;
    let user_ctx = RequestContext::new(COMPANY, USER);
    let (tx, _rx) = app.state.ws_manager.add("w".into(), user_ctx).await;
    let range = DateRange::new(d(2024, 1, 10), d(2024, 1, 11)).unwrap();

    let result = app
        .state
        .report_watches
        .start("w", user_ctx, RoomFilter::Single(ROOM_B), range, Arc::clone(&app.state.engine), tx)
        .await;

    assert_eq!(result.unwrap_err().code(), "FORBIDDEN");
    assert_eq!(app.state.report_watches.watch_count().await, 0);
}

#[tokio::test]
async fn writes_outside_the_watched_range_do_not_recompute() {
    let app = build_test_app().await;
    let _router = spawn_router(&app);
    let user_ctx = RequestContext::new(COMPANY, USER);
    let (tx, mut rx) = app.state.ws_manager.add("w".into(), user_ctx).await;
    let range = DateRange::day(d(2024, 1, 10));

    app.state
        .report_watches
        .start("w", user_ctx, RoomFilter::AllAuthorized, range, Arc::clone(&app.state.engine), tx)
        .await
        .unwrap();
    assert_eq!(next_json(&mut rx).await["type"], "report");

    app.state
        .engine
        .set_status(&user_ctx, ROOM_A, S1, d(2024, 2, 1), AttendanceStatus::Absent)
        .await
        .unwrap();
    // Only the change frame; no report.
    assert_eq!(next_json(&mut rx).await["type"], "attendance.changed");
    app.state
        .engine
        .set_status(&user_ctx, ROOM_A, S1, d(2024, 2, 2), AttendanceStatus::Absent)
        .await
        .unwrap();
    assert_eq!(next_json(&mut rx).await["type"], "attendance.changed");
}
