use axum::routing::get;
use axum::Router;

use crate::handlers::attendance;
use crate::state::AppState;

/// Cross-room attendance reads mounted at `/attendance`.
///
/// ```text
/// GET    /            -> list_range
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(attendance::list_range))
}
