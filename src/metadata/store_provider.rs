//! StoreMetadataProvider implementation.
//!
//! This module provides the primary MetadataProvider implementation that
//! reads SQLite's catalog pragmas through the shared connection pool.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::params;

use super::provider::{MetadataProvider, MetadataResult};
use super::{ColumnInfo, TableInfo};
use crate::store::PoolManager;

const LIST_TABLES_SQL: &str = "\
    SELECT schema, name FROM pragma_table_list \
    WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
    ORDER BY schema, name";

const SCHEMA_EXISTS_SQL: &str = "\
    SELECT EXISTS (SELECT 1 FROM pragma_database_list WHERE name = ?1)";

const TABLE_COLUMNS_SQL: &str = "\
    SELECT name, type, \"notnull\" FROM pragma_table_info(?1, ?2) \
    ORDER BY cid";

/// MetadataProvider implementation backed by the shared pool.
///
/// Each call borrows one connection for a single round-trip.
///
/// # Example
///
/// ```ignore
/// use mcp_sql::metadata::StoreMetadataProvider;
/// use mcp_sql::store::PoolManager;
///
/// let pools = Arc::new(PoolManager::new(settings.store.clone()));
/// let provider = StoreMetadataProvider::new(pools);
///
/// let tables = provider.list_tables().await?;
/// ```
#[derive(Clone)]
pub struct StoreMetadataProvider {
    pools: Arc<PoolManager>,
}

impl StoreMetadataProvider {
    /// Create a provider over the shared pool manager.
    pub fn new(pools: Arc<PoolManager>) -> Self {
        Self { pools }
    }
}

#[async_trait]
impl MetadataProvider for StoreMetadataProvider {
    async fn list_tables(&self) -> MetadataResult<Vec<TableInfo>> {
        self.pools
            .run(|conn| {
                let mut stmt = conn.prepare(LIST_TABLES_SQL)?;
                let tables = stmt
                    .query_map([], |row| {
                        Ok(TableInfo {
                            schema: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(tables)
            })
            .await
    }

    async fn get_columns(&self, schema: &str, table: &str) -> MetadataResult<Vec<ColumnInfo>> {
        let schema = schema.to_string();
        let table = table.to_string();

        self.pools
            .run(move |conn| {
                // pragma_table_info errors on an unattached schema name.
                let schema_exists: bool =
                    conn.query_row(SCHEMA_EXISTS_SQL, params![schema], |row| row.get(0))?;
                if !schema_exists {
                    return Ok(Vec::new());
                }

                let mut stmt = conn.prepare(TABLE_COLUMNS_SQL)?;
                let columns = stmt
                    .query_map(params![table, schema], |row| {
                        let not_null: i64 = row.get(2)?;
                        Ok(ColumnInfo {
                            name: row.get(0)?,
                            data_type: row.get(1)?,
                            nullable: not_null == 0,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(columns)
            })
            .await
    }
}
