//! Schema catalog: column metadata for the tables a question refers to.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use super::provider::MetadataProvider;
use super::types::{TableInfo, TableSchema};
use crate::config::CatalogSettings;
use crate::store::StoreError;

/// Errors from a catalog call. Any single failed lookup fails the call.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("schema lookup failed for table '{table}': {source}")]
    Lookup {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("listing tables failed: {0}")]
    List(#[source] StoreError),
}

/// Introspects a fixed or caller-supplied set of tables.
#[derive(Clone)]
pub struct SchemaCatalog {
    provider: Arc<dyn MetadataProvider>,
    settings: CatalogSettings,
}

impl SchemaCatalog {
    pub fn new(provider: Arc<dyn MetadataProvider>, settings: CatalogSettings) -> Self {
        Self { provider, settings }
    }

    /// Describe `tables` (or the configured defaults when `None`).
    ///
    /// One store round-trip per name, in order. An absent table yields an
    /// empty column list; a failed lookup aborts the whole call.
    #[instrument(skip(self, tables), fields(schema = %self.settings.default_schema))]
    pub async fn describe_tables(
        &self,
        tables: Option<&[String]>,
    ) -> Result<Vec<TableSchema>, CatalogError> {
        let names = tables.unwrap_or(&self.settings.default_tables);
        let mut schemas = Vec::with_capacity(names.len());

        for name in names {
            let columns = self
                .provider
                .get_columns(&self.settings.default_schema, name)
                .await
                .map_err(|source| CatalogError::Lookup {
                    table: name.clone(),
                    source,
                })?;

            if columns.is_empty() {
                debug!(table = %name, "table not found or has no columns");
            }

            schemas.push(TableSchema {
                name: name.clone(),
                columns,
            });
        }

        Ok(schemas)
    }

    /// Describe a single table, in `schema` or the default schema.
    pub async fn describe(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<TableSchema, CatalogError> {
        let schema = schema.unwrap_or(&self.settings.default_schema);
        let columns = self
            .provider
            .get_columns(schema, table)
            .await
            .map_err(|source| CatalogError::Lookup {
                table: table.to_string(),
                source,
            })?;

        Ok(TableSchema {
            name: table.to_string(),
            columns,
        })
    }

    /// List all base tables.
    pub async fn list_tables(&self) -> Result<Vec<TableInfo>, CatalogError> {
        self.provider.list_tables().await.map_err(CatalogError::List)
    }
}
