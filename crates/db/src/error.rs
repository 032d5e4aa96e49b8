//! Database-layer error type and its mapping onto the domain taxonomy.

use rollbook_core::error::CoreError;

/// PostgreSQL SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A row held a value the domain model cannot represent.
    #[error("Invalid row in {table}: {message}")]
    InvalidRow { table: &'static str, message: String },
}

impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlx(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                let constraint = db_err.constraint().unwrap_or("unknown");
                CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ))
            }
            DbError::InvalidRow { .. } => CoreError::Internal(err.to_string()),
            other => CoreError::Storage(other.to_string()),
        }
    }
}
