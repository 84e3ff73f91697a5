//! Model gateway: pluggable text-generation backends.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       ModelGateway                       │
//! │  name -> Arc<dyn ModelBackend>, built from [backends.*]  │
//! └──────────────────────────────────────────────────────────┘
//!                │                │                 │
//!                ▼                ▼                 ▼
//!        ProcessBackend    OllamaBackend     OpenAiBackend
//!        (child process)   (/api/generate)   (/chat/completions)
//! ```
//!
//! Backends never retry. Each call is bounded by the backend's timeout.

mod error;
mod ollama;
mod openai;
mod process;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use error::{GatewayError, GatewayResult};
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use process::ProcessBackend;

use crate::config::{BackendSettings, Settings};

/// Output mode requested from a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Ask for a single structured object, when the backend supports it.
    #[default]
    Json,
    /// Free text.
    Text,
}

/// A text-generation backend.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Configured name of this backend.
    fn name(&self) -> &str;

    /// Generate raw text for `prompt`.
    async fn generate(&self, prompt: &str, format: OutputFormat) -> GatewayResult<String>;
}

/// Registry of configured backends.
#[derive(Clone, Default)]
pub struct ModelGateway {
    backends: BTreeMap<String, Arc<dyn ModelBackend>>,
}

impl ModelGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one backend per `[backends.<name>]` entry.
    pub fn from_settings(settings: &Settings) -> GatewayResult<Self> {
        let mut gateway = Self::new();
        for (name, backend) in &settings.backends {
            gateway.register(build_backend(name, backend)?);
        }
        Ok(gateway)
    }

    /// Add (or replace) a backend under its own name.
    pub fn register(&mut self, backend: Arc<dyn ModelBackend>) {
        self.backends.insert(backend.name().to_string(), backend);
    }

    pub fn with_backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.register(backend);
        self
    }

    /// Look up a backend by name.
    pub fn get(&self, name: &str) -> GatewayResult<Arc<dyn ModelBackend>> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownBackend(name.to_string()))
    }

    /// Configured backend names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

fn build_backend(name: &str, settings: &BackendSettings) -> GatewayResult<Arc<dyn ModelBackend>> {
    let backend: Arc<dyn ModelBackend> = match settings {
        BackendSettings::Process { .. } => Arc::new(ProcessBackend::from_settings(name, settings)?),
        BackendSettings::Ollama { .. } => Arc::new(OllamaBackend::from_settings(name, settings)?),
        BackendSettings::Openai { .. } => Arc::new(OpenAiBackend::from_settings(name, settings)?),
    };
    Ok(backend)
}

/// Treat whitespace-only output as empty.
pub(crate) fn non_empty(backend: &str, text: String) -> GatewayResult<String> {
    if text.trim().is_empty() {
        Err(GatewayError::Empty {
            backend: backend.to_string(),
        })
    } else {
        Ok(text)
    }
}
