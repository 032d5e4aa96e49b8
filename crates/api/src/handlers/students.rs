use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use rollbook_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::{RangeParams, SearchParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /students/search?q=&limit=
pub async fn search(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<impl IntoResponse> {
    let students = state
        .engine
        .search_students(&auth.ctx(), &params.q, params.limit)
        .await?;
    Ok(Json(DataResponse { data: students }))
}

/// GET /students/{student_id}/history?from=&to= | ?preset=
///
/// `room_id` is ignored; history spans every authorized room of the student.
pub async fn history(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
    Query(params): Query<RangeParams>,
) -> AppResult<impl IntoResponse> {
    let range = params.resolve(state.engine.week_start())?;
    let history = state
        .engine
        .student_history(&auth.ctx(), student_id, range)
        .await?;
    Ok(Json(DataResponse { data: history }))
}
