//! Period selector endpoints. Pure calendar math; authentication is still
//! required so the surface is uniform.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use rollbook_core::period::{resolve_preset, shift, DateRange, PeriodPreset, ShiftDirection};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::{today, TodayParams};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ShiftBody {
    pub range: DateRange,
    pub direction: ShiftDirection,
}

/// GET /periods/{preset}?today=
pub async fn resolve(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(preset): Path<String>,
    Query(params): Query<TodayParams>,
) -> AppResult<impl IntoResponse> {
    let preset = PeriodPreset::from_str_value(&preset)?;
    let range = resolve_preset(
        preset,
        params.today.unwrap_or_else(today),
        state.engine.week_start(),
    )?;
    Ok(Json(DataResponse { data: range }))
}

/// POST /periods/shift
pub async fn shift_range(
    _auth: AuthUser,
    Json(body): Json<ShiftBody>,
) -> AppResult<impl IntoResponse> {
    // Deserialization does not run the constructor check.
    let range = DateRange::new(body.range.from, body.range.to)?;
    let shifted = shift(range, body.direction)?;
    Ok(Json(DataResponse { data: shifted }))
}
