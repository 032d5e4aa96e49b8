use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::RangeParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /attendance?room_id=&from=&to= | ?preset=
///
/// Without `room_id` the query covers every authorized room.
pub async fn list_range(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> AppResult<impl IntoResponse> {
    let range = params.resolve(state.engine.week_start())?;
    let records = state
        .engine
        .get_for_range(&auth.ctx(), params.room_filter(), range)
        .await?;
    Ok(Json(DataResponse { data: records }))
}
