//! Store-specific error types.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::validation::UnsafeQueryError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the relational store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Opening a connection (and therefore creating the pool) failed.
    #[error("failed to open database: {0}")]
    Open(#[source] rusqlite::Error),

    /// The store rejected or failed a statement.
    #[error("{0}")]
    Execution(#[source] rusqlite::Error),

    /// The text failed the SELECT-only rule.
    #[error(transparent)]
    Unsafe(#[from] UnsafeQueryError),

    /// The pool was closed while waiting for a connection.
    #[error("connection pool closed")]
    PoolClosed,

    /// The blocking task running the statement panicked or was cancelled.
    #[error("store task failed: {0}")]
    TaskFailed(String),
}

impl StoreError {
    /// Whether the error means the pool itself can no longer be trusted.
    ///
    /// Fatal errors invalidate the shared pool so the next acquisition
    /// builds a fresh one.
    pub fn is_fatal(&self) -> bool {
        match self {
            StoreError::Open(_) | StoreError::PoolClosed => true,
            StoreError::Execution(err) => matches!(
                err.sqlite_error_code(),
                Some(
                    ErrorCode::CannotOpen
                        | ErrorCode::NotADatabase
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::DatabaseCorrupt
                )
            ),
            StoreError::Unsafe(_) | StoreError::TaskFailed(_) => false,
        }
    }

    /// The store's own message, passed through verbatim.
    pub fn store_message(&self) -> String {
        match self {
            StoreError::Execution(err) | StoreError::Open(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Execution(err)
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}
