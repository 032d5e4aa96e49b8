use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::RangeParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /reports/summary?room_id=&from=&to= | ?preset=
///
/// Per-date breakdown, scope totals and per-room breakdown in one payload.
pub async fn summary(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> AppResult<impl IntoResponse> {
    let range = params.resolve(state.engine.week_start())?;
    let ctx = auth.ctx();
    let report = state
        .engine
        .report_summary(&ctx, params.room_filter(), range)
        .await?;

    tracing::debug!(
        company_id = ctx.company_id,
        user_id = ctx.user_id,
        rooms = report.room_ids.len(),
        records = report.totals.total_records,
        "Report summary computed"
    );
    Ok(Json(DataResponse { data: report }))
}
