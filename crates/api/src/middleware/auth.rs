//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rollbook_core::error::CoreError;
use rollbook_core::scope::RequestContext;
use rollbook_core::types::DbId;

use crate::auth::jwt::{validate_token, JwtConfig};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// Handlers turn it into a [`RequestContext`] with [`AuthUser::ctx`] and pass
/// that explicitly to every engine call.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub company_id: DbId,
}

impl AuthUser {
    pub fn ctx(&self) -> RequestContext {
        RequestContext::new(self.company_id, self.user_id)
    }

    /// Decode a raw token. Shared by the header extractor and the
    /// WebSocket `?token=` handshake.
    pub fn from_token(token: &str, config: &JwtConfig) -> Result<Self, AppError> {
        let claims = validate_token(token, config).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let ctx = claims.context();
        Ok(AuthUser {
            user_id: ctx.user_id,
            company_id: ctx.company_id,
        })
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        Self::from_token(token, &state.config.jwt)
    }
}
