//! TOML-based configuration for mcp-sql.
//!
//! Supports a config file (mcp-sql.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3001
//! api_token = "${MCP_SQL_API_TOKEN}"
//!
//! [store]
//! path = "./data/clinic.db"
//! max_connections = 8
//!
//! [catalog]
//! default_schema = "main"
//! default_tables = ["Patients", "Appointments"]
//!
//! [backends.ollama]
//! kind = "ollama"
//! endpoint = "http://localhost:11434"
//! model = "qwen2.5:3b"
//!
//! [backends.openrouter]
//! kind = "openai"
//! endpoint = "https://openrouter.ai/api/v1"
//! model = "openai/gpt-4o-mini"
//! api_key = "${OPENROUTER_API_KEY}"
//!
//! [backends.local]
//! kind = "process"
//! program = "ollama"
//! args = ["run", "qwen2.5:3b", "{prompt}"]
//! json_args = ["--format", "json"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::connection::{ConnectionError, StoreConfig};

/// Environment variable pointing at the config file.
pub const CONFIG_ENV: &str = "MCP_SQL_CONFIG";

/// Environment variable overriding the shared API token.
pub const API_TOKEN_ENV: &str = "MCP_SQL_API_TOKEN";

/// Placeholder replaced by the prompt in process backend arguments.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    #[error("Invalid store configuration: {0}")]
    Store(#[from] ConnectionError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// HTTP server configuration.
    pub server: ServerSettings,

    /// Relational store configuration.
    pub store: StoreConfig,

    /// Schema catalog configuration.
    pub catalog: CatalogSettings,

    /// Named text-generation backends.
    pub backends: BTreeMap<String, BackendSettings>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Shared secret expected in the `x-api-token` header
    /// (supports ${ENV_VAR} expansion).
    pub api_token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            api_token: None,
        }
    }
}

impl ServerSettings {
    /// Get the API token with environment variables expanded.
    ///
    /// The server refuses to run without one.
    pub fn resolved_api_token(&self) -> Result<String, SettingsError> {
        let raw = self.api_token.as_deref().ok_or_else(|| {
            SettingsError::InvalidConfig(format!(
                "server.api_token is not set (set it in the config file or via {})",
                API_TOKEN_ENV
            ))
        })?;

        let token = expand_env_vars(raw)?;
        if token.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "server.api_token must not be empty".to_string(),
            ));
        }
        Ok(token)
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Schema catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Logical schema namespace every lookup is scoped to.
    pub default_schema: String,

    /// Tables described when the caller does not name any.
    pub default_tables: Vec<String>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            default_schema: "main".to_string(),
            default_tables: Vec::new(),
        }
    }
}

/// Default backend timeout (on the order of minutes).
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;

fn default_timeout_secs() -> u64 {
    DEFAULT_BACKEND_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

/// Configuration of a single text-generation backend.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendSettings {
    /// Local generator invoked as a child process.
    Process {
        /// Executable to run.
        program: String,
        /// Argument template; an argument equal to `{prompt}` receives the prompt.
        #[serde(default)]
        args: Vec<String>,
        /// Extra arguments inserted before the prompt when JSON output is requested.
        #[serde(default)]
        json_args: Vec<String>,
        /// Put `--` before an appended prompt so it is never read as an option.
        #[serde(default = "default_true")]
        end_of_options: bool,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// Ollama REST API (`/api/generate`).
    Ollama {
        endpoint: String,
        model: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// OpenAI-compatible chat completions API (OpenAI, OpenRouter, ...).
    Openai {
        endpoint: String,
        model: String,
        /// Bearer token (supports ${ENV_VAR} expansion, never hard-code it).
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl BackendSettings {
    /// Short label for the backend kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendSettings::Process { .. } => "process",
            BackendSettings::Ollama { .. } => "ollama",
            BackendSettings::Openai { .. } => "openai",
        }
    }

    /// Request timeout in seconds.
    pub fn timeout_secs(&self) -> u64 {
        match self {
            BackendSettings::Process { timeout_secs, .. }
            | BackendSettings::Ollama { timeout_secs, .. }
            | BackendSettings::Openai { timeout_secs, .. } => *timeout_secs,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `MCP_SQL_CONFIG`
    /// 2. `./mcp-sql.toml`
    /// 3. `~/.config/mcp-sql/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("mcp-sql.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("mcp-sql").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Apply environment overrides and expand `${VAR}` references in paths.
    pub fn resolve(mut self) -> Result<Self, SettingsError> {
        if let Ok(token) = env::var(API_TOKEN_ENV) {
            self.server.api_token = Some(token);
        }

        self.store.apply_env()?;
        self.store.path = expand_env_vars(&self.store.path)?;
        self.store.validate()?;

        if self.catalog.default_schema.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "catalog.default_schema must not be empty".to_string(),
            ));
        }

        Ok(self)
    }

    /// Get a backend by name.
    pub fn get_backend(&self, name: &str) -> Result<&BackendSettings, SettingsError> {
        self.backends
            .get(name)
            .ok_or_else(|| SettingsError::BackendNotFound(name.to_string()))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    var_name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
