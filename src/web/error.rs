//! HTTP error mapping.

use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::SettingsError;
use crate::gateway::GatewayError;
use crate::metadata::CatalogError;
use crate::pipeline::AskError;
use crate::store::StoreError;
use crate::validation::ValidationError;

/// JSON error body: `{error, query?, raw?, backend?}`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            query: None,
            raw: None,
            backend: None,
        }
    }
}

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Ask(#[from] AskError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ApiError {
    /// Status code and body for this error.
    pub fn parts(&self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, ErrorBody::new("unauthorized")),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, ErrorBody::new(message)),
            ApiError::NotFound => (StatusCode::NOT_FOUND, ErrorBody::new("not found")),
            ApiError::Store(StoreError::Unsafe(err)) => {
                let mut body = ErrorBody::new(err.to_string());
                body.query = Some(err.query.clone());
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::Store(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new(err.store_message()),
            ),
            ApiError::Catalog(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new(err.to_string()),
            ),
            ApiError::Ask(err) => ask_parts(err),
        }
    }
}

fn ask_parts(err: &AskError) -> (StatusCode, ErrorBody) {
    let status = match err {
        AskError::EmptyQuestion => StatusCode::BAD_REQUEST,
        AskError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AskError::Gateway(GatewayError::UnknownBackend(_)) => StatusCode::NOT_FOUND,
        AskError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AskError::Validation { source, .. } => match source {
            ValidationError::Unsafe(_) | ValidationError::MissingQueryField { .. } => {
                StatusCode::BAD_REQUEST
            }
            ValidationError::NonStructured { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },
    };

    let mut body = ErrorBody::new(err.to_string());
    body.backend = err.backend().map(str::to_string);
    body.raw = err.raw().map(str::to_string);
    if let AskError::Validation {
        source: ValidationError::Unsafe(unsafe_query),
        ..
    } = err
    {
        body.query = Some(unsafe_query.query.clone());
    }

    (status, body)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else if status != StatusCode::UNAUTHORIZED {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("server I/O error: {0}")]
    Io(#[from] io::Error),
}
