//! Metadata provider module.
//!
//! This module provides abstractions for fetching table metadata from the
//! store and the schema catalog that feeds the prompt builder.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      SchemaCatalog                              │
//! │  - describe_tables(Option<&[String]>) -> Vec<TableSchema>       │
//! │  - one lookup per table, scoped to the default schema           │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MetadataProvider                           │
//! │  - list_tables()                                                │
//! │  - get_columns(schema, table)                                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │           StoreMetadataProvider (shared pool)                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod catalog;
mod provider;
mod store_provider;
mod types;

pub use catalog::{CatalogError, SchemaCatalog};
pub use provider::{MetadataProvider, MetadataResult};
pub use store_provider::StoreMetadataProvider;
pub use types::*;
