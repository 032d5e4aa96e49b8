use axum::routing::get;
use axum::Router;

use crate::handlers::reports;
use crate::state::AppState;

/// Reporting routes mounted at `/reports`.
///
/// ```text
/// GET    /summary      -> summary
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/summary", get(reports::summary))
}
