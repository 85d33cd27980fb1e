//! Session and connection configuration.

use crate::dialect::{Dialect, DialectKind};
use crate::error::{SqlError, SqlResult};
use serde::Deserialize;
use std::time::Duration;

/// Per-session behaviour.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// SQL dialect used to render statements.
    pub dialect: DialectKind,
    /// Statements slower than this emit a `sqlchain.exec.slow` event.
    pub slow_query_threshold: Option<Duration>,
    /// Statements running longer than this fail with [`SqlError::Timeout`].
    pub query_timeout: Option<Duration>,
    /// Include bound values in event fields (off by default; values may be sensitive).
    pub log_params: bool,
}

impl SessionConfig {
    /// Create a new configuration with defaults (Postgres, no slow threshold).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the slow query threshold.
    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn log_params(mut self, enabled: bool) -> Self {
        self.log_params = enabled;
        self
    }

    pub(crate) fn dialect_impl(&self) -> &'static dyn Dialect {
        self.dialect.dialect()
    }
}

fn default_max_pool_size() -> usize {
    16
}

/// Connection settings, typically loaded from a config file or the environment.
///
/// ```ignore
/// let cfg: ConnectionConfig = serde_json::from_str(r#"{
///     "database_url": "postgres://localhost/app",
///     "max_pool_size": 8,
///     "slow_query_threshold_ms": 250
/// }"#)?;
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub database_url: String,
    #[serde(default)]
    pub dialect: DialectKind,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: usize,
    #[serde(default)]
    pub slow_query_threshold_ms: Option<u64>,
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
    #[serde(default)]
    pub log_params: bool,
}

impl ConnectionConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            dialect: DialectKind::default(),
            max_pool_size: default_max_pool_size(),
            slow_query_threshold_ms: None,
            query_timeout_ms: None,
            log_params: false,
        }
    }

    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> SqlResult<Self> {
        serde_json::from_str(json).map_err(|e| SqlError::Config(e.to_string()))
    }

    /// Read `DATABASE_URL` plus the optional `SQLCHAIN_DIALECT`, `SQLCHAIN_MAX_POOL_SIZE`,
    /// `SQLCHAIN_SLOW_QUERY_MS` and `SQLCHAIN_QUERY_TIMEOUT_MS` variables.
    pub fn from_env() -> SqlResult<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| SqlError::Config("DATABASE_URL is not set".to_string()))?;
        let mut config = Self::new(database_url);

        if let Ok(dialect) = std::env::var("SQLCHAIN_DIALECT") {
            config.dialect = dialect.parse()?;
        }
        if let Ok(size) = std::env::var("SQLCHAIN_MAX_POOL_SIZE") {
            config.max_pool_size = size
                .parse()
                .map_err(|e| SqlError::Config(format!("SQLCHAIN_MAX_POOL_SIZE: {e}")))?;
        }
        if let Ok(ms) = std::env::var("SQLCHAIN_SLOW_QUERY_MS") {
            config.slow_query_threshold_ms = Some(
                ms.parse()
                    .map_err(|e| SqlError::Config(format!("SQLCHAIN_SLOW_QUERY_MS: {e}")))?,
            );
        }
        if let Ok(ms) = std::env::var("SQLCHAIN_QUERY_TIMEOUT_MS") {
            config.query_timeout_ms = Some(
                ms.parse()
                    .map_err(|e| SqlError::Config(format!("SQLCHAIN_QUERY_TIMEOUT_MS: {e}")))?,
            );
        }
        Ok(config)
    }

    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    /// The session settings implied by this connection config.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            dialect: self.dialect,
            slow_query_threshold: self.slow_query_threshold_ms.map(Duration::from_millis),
            query_timeout: self.query_timeout_ms.map(Duration::from_millis),
            log_params: self.log_params,
        }
    }
}
