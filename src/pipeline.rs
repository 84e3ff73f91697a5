//! Ask pipeline: question → catalog → prompt → backend → validator.
//!
//! The pipeline stops at a vetted query. Running it is a separate call to
//! the [`ExecutionGate`](crate::store::ExecutionGate), which re-checks the
//! text on its own.

use std::time::Instant;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::gateway::{GatewayError, ModelGateway, OutputFormat};
use crate::metadata::{CatalogError, SchemaCatalog};
use crate::prompt::build_prompt;
use crate::validation::{validate, ValidatedQuery, ValidationError};

/// Errors from one ask call. All are terminal for the request.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("{source}")]
    Validation {
        backend: String,
        #[source]
        source: ValidationError,
    },
}

impl AskError {
    /// Backend involved in the failure, when known.
    pub fn backend(&self) -> Option<&str> {
        match self {
            AskError::Gateway(err) => err.backend(),
            AskError::Validation { backend, .. } => Some(backend),
            AskError::EmptyQuestion | AskError::Catalog(_) => None,
        }
    }

    /// Raw model output, for diagnostics.
    pub fn raw(&self) -> Option<&str> {
        match self {
            AskError::Gateway(err) => err.raw(),
            AskError::Validation { source, .. } => source.raw(),
            AskError::EmptyQuestion | AskError::Catalog(_) => None,
        }
    }
}

/// A question to translate.
#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    pub question: String,
    /// Tables to describe; the catalog defaults when `None`.
    pub tables: Option<Vec<String>>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            tables: None,
        }
    }

    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = Some(tables);
        self
    }
}

/// Result of a successful ask call.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub query: ValidatedQuery,
    /// Raw backend output.
    pub raw: String,
    pub backend: String,
}

/// Composes the catalog, prompt builder, gateway and validator.
#[derive(Clone)]
pub struct AskPipeline {
    catalog: SchemaCatalog,
    gateway: ModelGateway,
}

impl AskPipeline {
    pub fn new(catalog: SchemaCatalog, gateway: ModelGateway) -> Self {
        Self { catalog, gateway }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Translate `request.question` into a validated query using `backend`.
    #[instrument(skip_all, fields(backend = %backend))]
    pub async fn ask(&self, backend: &str, request: &AskRequest) -> Result<AskOutcome, AskError> {
        if request.question.trim().is_empty() {
            return Err(AskError::EmptyQuestion);
        }

        // Resolve the backend first so an unknown name costs no store work.
        let model = self.gateway.get(backend)?;

        let tables = self
            .catalog
            .describe_tables(request.tables.as_deref())
            .await?;
        let prompt = build_prompt(&request.question, &tables);

        let started = Instant::now();
        let raw = model.generate(prompt.as_str(), OutputFormat::Json).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let query = match validate(&raw) {
            Ok(query) => query,
            Err(source) => {
                warn!(elapsed_ms, error = %source, "model output rejected");
                return Err(AskError::Validation {
                    backend: backend.to_string(),
                    source,
                });
            }
        };

        info!(
            tables = prompt.table_count(),
            elapsed_ms, "model produced a read-only query"
        );

        Ok(AskOutcome {
            query,
            raw,
            backend: backend.to_string(),
        })
    }
}
