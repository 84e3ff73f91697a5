//! Relational store connection configuration.
//!
//! Supports overrides via environment variables:
//! - `MCP_SQL_DB_PATH`: Path to the SQLite database file
//! - `MCP_SQL_DB_MAX_CONNECTIONS`: Upper bound on pooled connections

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the database path.
pub const DB_PATH_ENV: &str = "MCP_SQL_DB_PATH";

/// Environment variable overriding the pool size.
pub const DB_MAX_CONNECTIONS_ENV: &str = "MCP_SQL_DB_MAX_CONNECTIONS";

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar { name: String, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Connection parameters for the relational store.
///
/// These are fixed for the lifetime of the process: the pool manager builds
/// its single pool from them on first use.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file (supports ${ENV_VAR} expansion).
    pub path: String,

    /// Maximum number of simultaneously checked-out connections.
    pub max_connections: u32,

    /// How long a statement waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Open every connection with `PRAGMA query_only = ON`.
    pub query_only: bool,

    /// Create the database file when it does not exist.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "./data.db".to_string(),
            max_connections: 8,
            busy_timeout_ms: 5_000,
            query_only: true,
            create_if_missing: false,
        }
    }
}

impl StoreConfig {
    /// Create a config for a database file with default pool settings.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Apply `MCP_SQL_DB_*` environment overrides on top of this config.
    pub fn apply_env(&mut self) -> Result<(), ConnectionError> {
        if let Ok(path) = env::var(DB_PATH_ENV) {
            self.path = path;
        }

        if let Ok(value) = env::var(DB_MAX_CONNECTIONS_ENV) {
            self.max_connections =
                value
                    .parse()
                    .map_err(|_| ConnectionError::InvalidEnvVar {
                        name: DB_MAX_CONNECTIONS_ENV.to_string(),
                        value: value.clone(),
                    })?;
        }

        Ok(())
    }

    /// Check the values that would otherwise fail later at pool creation.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.path.trim().is_empty() {
            return Err(ConnectionError::InvalidConfig(
                "store.path must not be empty".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConnectionError::InvalidConfig(
                "store.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Database file location.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    /// Busy timeout as a duration.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Flags used when opening a pooled connection.
    pub fn open_flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        flags
    }
}
