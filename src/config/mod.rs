//! Configuration module for mcp-sql.
//!
//! Handles the settings file, store connection parameters, backend
//! definitions and environment variable expansion.

mod connection;
mod settings;

pub use connection::{ConnectionError, StoreConfig, DB_MAX_CONNECTIONS_ENV, DB_PATH_ENV};
pub use settings::{
    expand_env_vars, BackendSettings, CatalogSettings, ServerSettings, Settings, SettingsError,
    API_TOKEN_ENV, CONFIG_ENV, DEFAULT_BACKEND_TIMEOUT_SECS, PROMPT_PLACEHOLDER,
};
