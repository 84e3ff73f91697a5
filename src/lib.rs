//! # mcp-sql
//!
//! Turns natural-language questions into vetted, read-only SQL and runs it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  question (+ tables)                    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [metadata::SchemaCatalog]
//! ┌─────────────────────────────────────────────────────────┐
//! │           TableSchema per requested table               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [prompt]
//! ┌─────────────────────────────────────────────────────────┐
//! │                   PromptContext                         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [gateway::ModelBackend]
//! ┌─────────────────────────────────────────────────────────┐
//! │                raw model output                         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [validation]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ValidatedQuery                         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [store::ExecutionGate → PoolManager]
//! ┌─────────────────────────────────────────────────────────┐
//! │                   QueryResult                           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The ask pipeline stops at `ValidatedQuery`; execution is a separate call
//! and re-applies the SELECT-only rule itself.

pub mod config;
pub mod gateway;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod prompt;
pub mod store;
pub mod validation;
pub mod web;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::gateway::{ModelBackend, ModelGateway, OutputFormat};
    pub use crate::metadata::{MetadataProvider, SchemaCatalog, TableSchema};
    pub use crate::pipeline::{AskOutcome, AskPipeline, AskRequest};
    pub use crate::store::{ExecutionGate, PoolManager, QueryResult};
    pub use crate::validation::{validate, ValidatedQuery};
}
