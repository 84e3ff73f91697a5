//! Gateway-specific error types.

use std::io;
use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised while invoking a text-generation backend.
///
/// Every variant names the backend; none carries credentials.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The backend could not be reached or the child process failed.
    #[error("backend '{backend}' transport failure: {message}")]
    Transport { backend: String, message: String },

    /// The bounded timeout fired before the backend answered.
    #[error("backend '{backend}' timed out after {secs} seconds")]
    Timeout { backend: String, secs: u64 },

    /// The backend answered with a non-success status.
    #[error("backend '{backend}' returned status {status}: {body}")]
    Status {
        backend: String,
        status: u16,
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("backend '{backend}' returned a malformed envelope: {message}")]
    Envelope {
        backend: String,
        message: String,
        raw: String,
    },

    /// The backend answered successfully but produced no text.
    #[error("backend '{backend}' returned an empty result")]
    Empty { backend: String },

    /// No backend is configured under this name.
    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    /// The backend configuration is unusable.
    #[error("backend '{backend}' misconfigured: {message}")]
    Config { backend: String, message: String },
}

impl GatewayError {
    pub fn transport(backend: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    pub fn envelope(backend: &str, message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Envelope {
            backend: backend.to_string(),
            message: message.into(),
            raw: raw.into(),
        }
    }

    pub fn config(backend: &str, message: impl Into<String>) -> Self {
        Self::Config {
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    /// Map an I/O error from spawning or talking to a child process.
    pub fn io(backend: &str, err: io::Error) -> Self {
        Self::transport(backend, err.to_string())
    }

    /// Map a reqwest error, keeping timeouts distinct.
    pub fn http(backend: &str, secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                backend: backend.to_string(),
                secs,
            }
        } else if err.is_connect() {
            Self::transport(backend, format!("connection failed: {err}"))
        } else {
            Self::transport(backend, err.to_string())
        }
    }

    /// Name of the backend involved, if any.
    pub fn backend(&self) -> Option<&str> {
        match self {
            Self::Transport { backend, .. }
            | Self::Timeout { backend, .. }
            | Self::Status { backend, .. }
            | Self::Envelope { backend, .. }
            | Self::Empty { backend }
            | Self::Config { backend, .. } => Some(backend),
            Self::UnknownBackend(name) => Some(name),
        }
    }

    /// Whether this is a transport-class failure.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Status { .. }
        )
    }

    /// Raw response text, when the envelope was malformed.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Envelope { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
