use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::rooms;
use crate::state::AppState;

/// Room-scoped routes mounted at `/rooms`.
///
/// ```text
/// GET    /                                        -> list_rooms
/// GET    /{room_id}/attendance/{date}             -> get_day
/// DELETE /{room_id}/attendance/{date}             -> cancel_day
/// POST   /{room_id}/attendance/{date}/bulk        -> bulk_set_status
/// PUT    /{room_id}/attendance/{date}/{student_id} -> set_status
/// DELETE /{room_id}/attendance/{date}/{student_id} -> clear_status
/// GET    /{room_id}/roster/{date}                 -> get_roster
/// DELETE /{room_id}/observations/{date}           -> cancel_observations
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(rooms::list_rooms))
        .route(
            "/{room_id}/attendance/{date}",
            get(rooms::get_day).delete(rooms::cancel_day),
        )
        .route(
            "/{room_id}/attendance/{date}/bulk",
            post(rooms::bulk_set_status),
        )
        .route(
            "/{room_id}/attendance/{date}/{student_id}",
            put(rooms::set_status).delete(rooms::clear_status),
        )
        .route("/{room_id}/roster/{date}", get(rooms::get_roster))
        .route(
            "/{room_id}/observations/{date}",
            delete(rooms::cancel_observations),
        )
}
