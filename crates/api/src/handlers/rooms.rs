//! Handlers for room-scoped attendance: the room picker, the day view,
//! the roster, and single-record and whole-day writes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rollbook_core::attendance::AttendanceStatus;
use rollbook_core::types::{Date, DbId};
use serde::{Deserialize, Serialize};

use crate::engine::BulkEntry;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkSetBody {
    pub entries: Vec<BulkEntry>,
}

#[derive(Debug, Serialize)]
pub struct CancelDayResponse {
    pub removed: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /rooms
pub async fn list_rooms(auth: AuthUser, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let rooms = state.engine.list_authorized_rooms(&auth.ctx()).await?;
    Ok(Json(DataResponse { data: rooms }))
}

/// GET /rooms/{room_id}/attendance/{date}
///
/// Map of student id to status for one room and day.
pub async fn get_day(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((room_id, date)): Path<(DbId, Date)>,
) -> AppResult<impl IntoResponse> {
    let day = state.engine.get_for_day(&auth.ctx(), room_id, date).await?;
    Ok(Json(DataResponse { data: day }))
}

/// GET /rooms/{room_id}/roster/{date}
pub async fn get_roster(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((room_id, date)): Path<(DbId, Date)>,
) -> AppResult<impl IntoResponse> {
    let roster = state.engine.room_roster(&auth.ctx(), room_id, date).await?;
    Ok(Json(DataResponse { data: roster }))
}

/// PUT /rooms/{room_id}/attendance/{date}/{student_id}
pub async fn set_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((room_id, date, student_id)): Path<(DbId, Date, DbId)>,
    Json(body): Json<SetStatusBody>,
) -> AppResult<impl IntoResponse> {
    let status = AttendanceStatus::from_str_value(&body.status)?;
    let record = state
        .engine
        .set_status(&auth.ctx(), room_id, student_id, date, status)
        .await?;
    Ok(Json(DataResponse { data: record }))
}

/// DELETE /rooms/{room_id}/attendance/{date}/{student_id}
///
/// 204 whether or not a record existed.
pub async fn clear_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((room_id, date, student_id)): Path<(DbId, Date, DbId)>,
) -> AppResult<impl IntoResponse> {
    state
        .engine
        .clear_status(&auth.ctx(), room_id, student_id, date)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /rooms/{room_id}/attendance/{date}/bulk
///
/// Always 200 once the room is authorized; per-entry outcomes are in the body.
pub async fn bulk_set_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((room_id, date)): Path<(DbId, Date)>,
    Json(body): Json<BulkSetBody>,
) -> AppResult<impl IntoResponse> {
    let result = state
        .engine
        .bulk_set_status(&auth.ctx(), room_id, date, &body.entries)
        .await?;
    Ok(Json(DataResponse { data: result }))
}

/// DELETE /rooms/{room_id}/attendance/{date}
pub async fn cancel_day(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((room_id, date)): Path<(DbId, Date)>,
) -> AppResult<impl IntoResponse> {
    let removed = state.engine.cancel_day(&auth.ctx(), room_id, date).await?;
    Ok(Json(DataResponse {
        data: CancelDayResponse { removed },
    }))
}

/// DELETE /rooms/{room_id}/observations/{date}
pub async fn cancel_observations(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((room_id, date)): Path<(DbId, Date)>,
) -> AppResult<impl IntoResponse> {
    let removed = state
        .engine
        .cancel_observations_for_day(&auth.ctx(), room_id, date)
        .await?;
    Ok(Json(DataResponse {
        data: CancelDayResponse { removed },
    }))
}
