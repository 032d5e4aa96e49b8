use axum::routing::get;
use axum::Router;

use crate::handlers::students;
use crate::state::AppState;

/// Student lookup routes mounted at `/students`.
///
/// ```text
/// GET    /search                   -> search
/// GET    /{student_id}/history     -> history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(students::search))
        .route("/{student_id}/history", get(students::history))
}
