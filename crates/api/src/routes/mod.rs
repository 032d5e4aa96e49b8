pub mod attendance;
pub mod health;
pub mod observations;
pub mod periods;
pub mod reports;
pub mod rooms;
pub mod students;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                              change notifications + live reports
///
/// /rooms                                           authorized rooms (GET)
/// /rooms/{room_id}/attendance/{date}               day map (GET), cancel day (DELETE)
/// /rooms/{room_id}/attendance/{date}/bulk          bulk set (POST)
/// /rooms/{room_id}/attendance/{date}/{student_id}  set (PUT), clear (DELETE)
/// /rooms/{room_id}/roster/{date}                   roster (GET)
/// /rooms/{room_id}/observations/{date}             cancel day's notes (DELETE)
///
/// /attendance                                      range read (?room_id, from/to | preset)
///
/// /observations/{date}                             day notes (GET, ?room_id)
/// /observations/{date}/{student_id}                set or clear note (PUT)
///
/// /periods/{preset}                                resolve preset (GET, ?today)
/// /periods/shift                                   shift range (POST)
///
/// /reports/summary                                 report (GET, ?room_id, from/to | preset)
///
/// /students/search                                 name search (GET, ?q)
/// /students/{student_id}/history                   student history (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/rooms", rooms::router())
        .nest("/attendance", attendance::router())
        .nest("/observations", observations::router())
        .nest("/periods", periods::router())
        .nest("/reports", reports::router())
        .nest("/students", students::router())
}
