//! Execution gate: the last check before text reaches the store.

use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use super::error::{StoreError, StoreResult};
use super::manager::PoolManager;
use crate::validation::{self, UnsafeQueryError};

/// One result row: column name to value, in the store's column order.
pub type Row = Map<String, Value>;

/// Rows returned by a query, in the store's natural order.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct QueryResult {
    /// Column names in select-list order.
    pub columns: Vec<String>,
    /// Result rows.
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Number of rows returned.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were returned.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Runs read-only queries against the shared pool.
///
/// The SELECT-only rule is enforced here independently of the response
/// validator, so text submitted directly is held to the same standard as
/// model output.
#[derive(Clone)]
pub struct ExecutionGate {
    pools: Arc<PoolManager>,
}

impl ExecutionGate {
    /// Create a gate over the shared pool manager.
    pub fn new(pools: Arc<PoolManager>) -> Self {
        Self { pools }
    }

    /// Validate and execute `sql` as a single statement with no parameters.
    pub async fn execute(&self, sql: &str) -> StoreResult<QueryResult> {
        let query = validation::require_read_only(sql)?;
        let started = Instant::now();

        let result = self
            .pools
            .run(move |conn| run_select(conn, query.as_str()))
            .await?;

        info!(
            rows = result.len(),
            columns = result.columns.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query executed"
        );
        Ok(result)
    }
}

/// Prepare and run one read-only statement.
fn run_select(conn: &Connection, sql: &str) -> StoreResult<QueryResult> {
    let mut stmt = conn.prepare(sql).map_err(StoreError::Execution)?;

    if !stmt.readonly() {
        debug!("statement passed the leading-token rule but writes");
        return Err(UnsafeQueryError {
            query: sql.to_string(),
        }
        .into());
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([]).map_err(StoreError::Execution)?;
    let mut out = Vec::new();

    while let Some(row) = rows.next().map_err(StoreError::Execution)? {
        let mut record = Map::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            let value = row.get_ref(idx).map_err(StoreError::Execution)?;
            record.insert(name.clone(), to_json(value));
        }
        out.push(record);
    }

    Ok(QueryResult { columns, rows: out })
}

/// Map a store value to JSON.
fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
    }
}
