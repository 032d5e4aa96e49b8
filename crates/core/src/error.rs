use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but holds no grant for the requested room.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The storage backend failed. Callers may retry.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable code, shared by HTTP responses and bulk results.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to a client. Storage and internal details are
    /// replaced with generic text.
    pub fn client_message(&self) -> String {
        match self {
            Self::NotFound { entity, id } => format!("{entity} with id {id} not found"),
            Self::Validation(msg)
            | Self::Conflict(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg) => msg.clone(),
            Self::Storage(_) => "Storage is temporarily unavailable, please retry".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    /// Shorthand for the room-grant denial used throughout the engine.
    pub fn room_forbidden(room_id: DbId) -> Self {
        Self::Forbidden(format!("No access to room {room_id}"))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_hides_backend_details() {
        let storage = CoreError::Storage("connection reset by peer".into());
        assert!(!storage.client_message().contains("peer"));
        let internal = CoreError::Internal("row 7 has status 'x'".into());
        assert!(!internal.client_message().contains("row 7"));
        let validation = CoreError::Validation("entries must not be empty".into());
        assert_eq!(validation.client_message(), "entries must not be empty");
    }
}
