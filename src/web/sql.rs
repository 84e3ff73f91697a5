//! `/sql/*` handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ApiError;
use super::server::AppState;
use crate::metadata::{ColumnInfo, TableInfo};
use crate::pipeline::AskRequest;
use crate::store::QueryResult;

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<TableInfo>,
}

#[derive(Debug, Deserialize)]
pub struct DescribeBody {
    /// Defaults to the catalog's schema.
    #[serde(default)]
    pub schema: Option<String>,
    pub table: String,
}

#[derive(Debug, Serialize)]
pub struct DescribeResponse {
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBody {
    #[serde(default)]
    pub sql_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskBody {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub tables: Option<Vec<String>>,
    #[serde(default)]
    pub include_raw: bool,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub query: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sql/tables - List base tables.
pub async fn list_tables(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TablesResponse>, ApiError> {
    let tables = state.catalog().list_tables().await?;
    Ok(Json(TablesResponse { tables }))
}

/// POST /sql/describe - Columns of one table (empty when it does not exist).
pub async fn describe_table(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DescribeBody>, JsonRejection>,
) -> Result<Json<DescribeResponse>, ApiError> {
    let req = body(payload)?;
    if req.table.trim().is_empty() {
        return Err(ApiError::BadRequest("table must not be empty".to_string()));
    }

    let schema = state
        .catalog()
        .describe(req.schema.as_deref(), &req.table)
        .await?;

    Ok(Json(DescribeResponse {
        columns: schema.columns,
    }))
}

/// POST /sql/query - Execute caller-supplied text through the gate.
pub async fn run_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryBody>, JsonRejection>,
) -> Result<Json<QueryResult>, ApiError> {
    let req = body(payload)?;
    let result = state.gate.execute(&req.sql_text).await?;
    Ok(Json(result))
}

/// POST /sql/ask-<backend> - Translate a question; never executes.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    backend: String,
    payload: Result<Json<AskBody>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let req = body(payload)?;

    let request = AskRequest {
        question: req.question,
        tables: req.tables,
    };
    let outcome = state.pipeline.ask(&backend, &request).await?;

    info!(backend = %outcome.backend, "ask answered");

    Ok(Json(AskResponse {
        query: outcome.query.into_inner(),
        backend: outcome.backend,
        raw: req.include_raw.then_some(outcome.raw),
    }))
}
