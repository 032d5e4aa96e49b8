use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rollbook_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `rollbook_core` or a storage backend.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status, stable code, and client-facing message.
    ///
    /// Internal and storage details are logged here and never echoed.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        let AppError::Core(core) = self;
        let status = match core {
            CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            CoreError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                StatusCode::SERVICE_UNAVAILABLE
            }
            CoreError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal core error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, core.code(), core.client_message())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
