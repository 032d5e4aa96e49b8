use axum::routing::{get, post};
use axum::Router;

use crate::handlers::periods;
use crate::state::AppState;

/// Period selector routes mounted at `/periods`.
///
/// ```text
/// POST   /shift        -> shift_range
/// GET    /{preset}     -> resolve
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shift", post(periods::shift_range))
        .route("/{preset}", get(periods::resolve))
}
