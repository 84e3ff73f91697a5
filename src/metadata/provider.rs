//! MetadataProvider trait definition.
//!
//! The MetadataProvider trait abstracts over different ways of fetching
//! table metadata. The primary implementation queries the shared store
//! pool; tests substitute their own.

use async_trait::async_trait;

use super::types::{ColumnInfo, TableInfo};
use crate::store::StoreError;

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, StoreError>;

/// Trait for fetching table metadata.
///
/// # Example
///
/// ```ignore
/// use mcp_sql::metadata::MetadataProvider;
///
/// async fn example(provider: &impl MetadataProvider) -> MetadataResult<()> {
///     let tables = provider.list_tables().await?;
///     let columns = provider.get_columns("main", "Patients").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// List all base tables across schemas.
    async fn list_tables(&self) -> MetadataResult<Vec<TableInfo>>;

    /// Get the columns of one table, in store order.
    ///
    /// A table that does not exist yields an empty list, not an error.
    async fn get_columns(&self, schema: &str, table: &str) -> MetadataResult<Vec<ColumnInfo>>;
}
