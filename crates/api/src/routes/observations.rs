use axum::routing::{get, put};
use axum::Router;

use crate::handlers::observations;
use crate::state::AppState;

/// Observation routes mounted at `/observations`.
///
/// ```text
/// GET    /{date}                 -> get_day
/// PUT    /{date}/{student_id}    -> set_observation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{date}", get(observations::get_day))
        .route("/{date}/{student_id}", put(observations::set_observation))
}
