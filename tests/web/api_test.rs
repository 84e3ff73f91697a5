#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use mcp_sql::config::StoreConfig;
use mcp_sql::store::PoolManager;
use mcp_sql::web::{router, AppState, API_TOKEN_HEADER};

use common::MockBackend;

struct TestApp {
    _dir: tempfile::TempDir,
    config: StoreConfig,
    pools: Arc<PoolManager>,
    app: Router,
}

fn app_with(backends: &[Arc<MockBackend>]) -> TestApp {
    let (dir, config) = common::patients_db();
    let pools = Arc::new(PoolManager::new(config.clone()));
    let state = AppState::new(
        Arc::clone(&pools),
        common::catalog(&pools, &["Patients"]),
        common::gateway_with(backends),
        common::TOKEN,
    );
    TestApp {
        _dir: dir,
        config,
        pools,
        app: router(Arc::new(state)),
    }
}

async fn post(app: &Router, path: &str, token: Option<&str>, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(API_TOKEN_HEADER, token);
    }
    let request = builder
        .body(Body::from(body.unwrap_or("").to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn authed(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    post(app, path, Some(common::TOKEN), Some(&body.to_string())).await
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_missing_or_wrong_token_is_unauthorized() {
    let t = app_with(&[MockBackend::new("mock", r#"{"query":"SELECT 1"}"#)]);

    for token in [None, Some("wrong"), Some("")] {
        for path in ["/sql/tables", "/sql/query", "/sql/ask-mock", "/nowhere"] {
            let (status, body) = post(&t.app, path, token, Some("{}")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{path} {token:?}");
            assert_eq!(body, json!({"error": "unauthorized"}));
        }
    }

    // Rejected before any work: no pool was built.
    assert!(!t.pools.is_initialized().await);
}

// ============================================================================
// Introspection
// ============================================================================

#[tokio::test]
async fn test_tables_lists_base_tables() {
    let t = app_with(&[]);
    let (status, body) = authed(&t.app, "/sql/tables", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"tables": [{"schema": "main", "name": "Patients"}]}));
}

#[tokio::test]
async fn test_describe_table_and_absent_table() {
    let t = app_with(&[]);

    let (status, body) = authed(
        &t.app,
        "/sql/describe",
        json!({"schema": "main", "table": "Patients"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"columns": [
            {"name": "id", "dataType": "INT", "nullable": true},
            {"name": "name", "dataType": "VARCHAR", "nullable": true}
        ]})
    );

    let (status, body) = authed(&t.app, "/sql/describe", json!({"table": "Nope"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"columns": []}));

    let (status, body) = authed(
        &t.app,
        "/sql/describe",
        json!({"schema": "dbo", "table": "Patients"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"columns": []}));

    let (status, body) = authed(&t.app, "/sql/describe", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// ============================================================================
// Direct execution
// ============================================================================

#[tokio::test]
async fn test_query_returns_rows() {
    let t = app_with(&[]);
    let (status, body) = authed(
        &t.app,
        "/sql/query",
        json!({"sqlText": "SELECT * FROM Patients"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["rows"],
        json!([{"id": 1, "name": "Ana"}, {"id": 2, "name": "Ben"}])
    );
}

#[tokio::test]
async fn test_query_rejects_non_select_with_400() {
    let t = app_with(&[]);
    let (status, body) = authed(
        &t.app,
        "/sql/query",
        json!({"sqlText": "DELETE FROM Patients"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": "not a read-only query", "query": "DELETE FROM Patients"})
    );
    assert_eq!(common::patient_count(&t.config), 2);

    // Missing sqlText is the empty string, which is not a SELECT either.
    let (status, _) = authed(&t.app, "/sql/query", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_query_store_error_is_500_with_store_message() {
    let t = app_with(&[]);
    let (status, body) = authed(
        &t.app,
        "/sql/query",
        json!({"sqlText": "SELECT * FROM Missing"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Missing"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let t = app_with(&[]);
    let (status, body) = post(&t.app, "/sql/query", Some(common::TOKEN), Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// ============================================================================
// Ask
// ============================================================================

#[tokio::test]
async fn test_ask_returns_query_without_executing() {
    let backend = MockBackend::new("mock", r#"{"query":"SELECT * FROM Patients"}"#);
    let t = app_with(&[Arc::clone(&backend)]);

    let (status, body) = authed(
        &t.app,
        "/sql/ask-mock",
        json!({"question": "list all patients", "tables": ["Patients"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"query": "SELECT * FROM Patients", "backend": "mock"})
    );
    assert_eq!(backend.calls(), 1);
    let prompt = backend.last_prompt().unwrap();
    assert!(prompt.contains("Table Patients: id (INT), name (VARCHAR)"));
    assert!(prompt.contains("Question: list all patients"));
}

#[tokio::test]
async fn test_ask_include_raw() {
    let raw = r#"{"query": "{SELECT 1}"}"#;
    let t = app_with(&[MockBackend::new("mock", raw)]);

    let (status, body) = authed(
        &t.app,
        "/sql/ask-mock",
        json!({"question": "one", "includeRaw": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "SELECT 1");
    assert_eq!(body["raw"], raw);
}

#[tokio::test]
async fn test_ask_unsafe_output_is_400_and_never_executed() {
    let t = app_with(&[MockBackend::new("mock", r#"{"query":"DELETE FROM Patients"}"#)]);

    let (status, body) = authed(&t.app, "/sql/ask-mock", json!({"question": "remove everyone"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "not a read-only query");
    assert_eq!(body["query"], "DELETE FROM Patients");
    assert_eq!(body["backend"], "mock");
    assert_eq!(common::patient_count(&t.config), 2);
}

#[tokio::test]
async fn test_ask_and_direct_rejections_match() {
    let t = app_with(&[MockBackend::new("mock", r#"{"query":"DROP TABLE Patients"}"#)]);

    let (ask_status, ask_body) = authed(&t.app, "/sql/ask-mock", json!({"question": "q"})).await;
    let (direct_status, direct_body) = authed(
        &t.app,
        "/sql/query",
        json!({"sqlText": "DROP TABLE Patients"}),
    )
    .await;

    assert_eq!(ask_status, direct_status);
    assert_eq!(ask_body["error"], direct_body["error"]);
    assert_eq!(ask_body["query"], direct_body["query"]);
}

#[tokio::test]
async fn test_ask_non_structured_output_is_500_with_raw() {
    let t = app_with(&[MockBackend::new("mock", "Sure! SELECT * FROM Patients")]);

    let (status, body) = authed(&t.app, "/sql/ask-mock", json!({"question": "q"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "non-structured model output");
    assert_eq!(body["raw"], "Sure! SELECT * FROM Patients");
}

#[tokio::test]
async fn test_ask_missing_query_field_is_400() {
    let t = app_with(&[MockBackend::new("mock", r#"{"sql":"SELECT 1"}"#)]);

    let (status, body) = authed(&t.app, "/sql/ask-mock", json!({"question": "q"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing query field");
}

#[tokio::test]
async fn test_ask_empty_question_is_400() {
    let backend = MockBackend::new("mock", r#"{"query":"SELECT 1"}"#);
    let t = app_with(&[Arc::clone(&backend)]);

    let (status, _) = authed(&t.app, "/sql/ask-mock", json!({"question": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_unknown_backend_route_is_404() {
    let t = app_with(&[MockBackend::new("mock", r#"{"query":"SELECT 1"}"#)]);

    let (status, body) = authed(&t.app, "/sql/ask-other", json!({"question": "q"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "not found"}));
}

#[tokio::test]
async fn test_catalog_failure_aborts_ask() {
    let backend = MockBackend::new("mock", r#"{"query":"SELECT 1"}"#);
    let dir = tempfile::tempdir().unwrap();
    let missing = StoreConfig::sqlite(dir.path().join("gone.db").to_string_lossy());
    let pools = Arc::new(PoolManager::new(missing));
    let state = AppState::new(
        Arc::clone(&pools),
        common::catalog(&pools, &["Patients"]),
        common::gateway_with(&[Arc::clone(&backend)]),
        common::TOKEN,
    );
    let app = router(Arc::new(state));

    let (status, body) = authed(&app, "/sql/ask-mock", json!({"question": "q"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Patients"));
    assert_eq!(backend.calls(), 0);
}
