use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use rollbook_core::scope::RoomFilter;
use rollbook_core::types::{Date, DbId};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::RoomParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetObservationBody {
    pub text: String,
}

/// PUT /observations/{date}/{student_id}
///
/// Returns the stored note, or `null` when blank text cleared it.
pub async fn set_observation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((date, student_id)): Path<(Date, DbId)>,
    Json(body): Json<SetObservationBody>,
) -> AppResult<impl IntoResponse> {
    let observation = state
        .engine
        .set_observation(&auth.ctx(), student_id, date, &body.text)
        .await?;
    Ok(Json(DataResponse { data: observation }))
}

/// GET /observations/{date}?room_id=
pub async fn get_day(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(date): Path<Date>,
    Query(params): Query<RoomParams>,
) -> AppResult<impl IntoResponse> {
    let notes = state
        .engine
        .get_observations_for_day(&auth.ctx(), RoomFilter::from_optional(params.room_id), date)
        .await?;
    Ok(Json(DataResponse { data: notes }))
}
