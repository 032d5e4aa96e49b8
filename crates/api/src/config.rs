use rollbook_core::period::WeekStart;

use crate::auth::jwt::JwtConfig;

/// Default cap on report and range query length (about five years).
pub const DEFAULT_REPORT_MAX_RANGE_DAYS: u64 = 1830;

/// Which storage backend the engine runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local maps. Data is lost on restart.
    Memory,
}

impl StorageBackend {
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on post-shutdown cleanup, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub storage: StorageBackend,
    /// Required when `storage` is [`StorageBackend::Postgres`].
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// First day of the week for `thisWeek` / `lastWeek` presets.
    pub week_start: WeekStart,
    /// Longest date range accepted by range reads and reports.
    pub report_max_range_days: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                    |
    /// |--------------------------|----------------------------|
    /// | `HOST`                   | `0.0.0.0`                  |
    /// | `PORT`                   | `3000`                     |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `30`                       |
    /// | `STORAGE_BACKEND`        | `postgres`                 |
    /// | `DATABASE_URL`           | -- (required for postgres) |
    /// | `DB_MAX_CONNECTIONS`     | `20`                       |
    /// | `WEEK_START`             | `monday`                   |
    /// | `REPORT_MAX_RANGE_DAYS`  | `1830`                     |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on any malformed value so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let storage_raw = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "postgres".into());
        let storage = StorageBackend::from_str_value(&storage_raw)
            .unwrap_or_else(|| panic!("STORAGE_BACKEND must be 'postgres' or 'memory', got '{storage_raw}'"));

        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if storage == StorageBackend::Postgres {
            assert!(
                database_url.is_some(),
                "DATABASE_URL must be set when STORAGE_BACKEND=postgres"
            );
        }

        let db_max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| rollbook_db::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        let week_start = match std::env::var("WEEK_START") {
            Ok(v) => WeekStart::from_str_value(&v).unwrap_or_else(|e| panic!("WEEK_START: {e}")),
            Err(_) => WeekStart::default(),
        };

        let report_max_range_days: u64 = std::env::var("REPORT_MAX_RANGE_DAYS")
            .unwrap_or_else(|_| DEFAULT_REPORT_MAX_RANGE_DAYS.to_string())
            .parse()
            .expect("REPORT_MAX_RANGE_DAYS must be a valid u64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            storage,
            database_url,
            db_max_connections,
            week_start,
            report_max_range_days,
            jwt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_known_values() {
        assert_eq!(StorageBackend::from_str_value("memory"), Some(StorageBackend::Memory));
        assert_eq!(StorageBackend::from_str_value(" Postgres "), Some(StorageBackend::Postgres));
        assert_eq!(StorageBackend::from_str_value("sqlite"), None);
    }
}
