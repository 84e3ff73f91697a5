//! Remote backends against an in-process fake server.

use std::time::Duration;

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use mcp_sql::gateway::{GatewayError, ModelBackend, OllamaBackend, OpenAiBackend, OutputFormat};

/// Serve `app` on an ephemeral port and return its base URL.
async fn spawn_fake(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ============================================================================
// Ollama
// ============================================================================

#[tokio::test]
async fn test_ollama_returns_response_field() {
    let app = Router::new().route(
        "/api/generate",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["model"], "llama3");
            assert_eq!(body["format"], "json");
            assert_eq!(body["stream"], false);
            assert!(body["prompt"].as_str().unwrap().contains("patients"));
            Json(json!({"model": "llama3", "response": "{\"query\":\"SELECT 1\"}", "done": true}))
        }),
    );
    let url = spawn_fake(app).await;

    let backend = OllamaBackend::new("ollama", &url, "llama3", 5).unwrap();
    let raw = backend
        .generate("list all patients", OutputFormat::Json)
        .await
        .unwrap();
    assert_eq!(raw, r#"{"query":"SELECT 1"}"#);
}

#[tokio::test]
async fn test_ollama_malformed_envelope_keeps_raw_body() {
    let app = Router::new().route("/api/generate", post(|| async { "<html>oops</html>" }));
    let url = spawn_fake(app).await;

    let backend = OllamaBackend::new("ollama", &url, "llama3", 5).unwrap();
    let err = backend.generate("q", OutputFormat::Json).await.unwrap_err();

    assert!(matches!(err, GatewayError::Envelope { .. }), "{err:?}");
    assert_eq!(err.raw(), Some("<html>oops</html>"));
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_ollama_error_status() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
    );
    let url = spawn_fake(app).await;

    let backend = OllamaBackend::new("ollama", &url, "llama3", 5).unwrap();
    match backend.generate("q", OutputFormat::Json).await.unwrap_err() {
        GatewayError::Status {
            backend,
            status,
            body,
        } => {
            assert_eq!(backend, "ollama");
            assert_eq!(status, 500);
            assert_eq!(body, "model crashed");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_ollama_empty_response() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async { Json(json!({"response": "   "})) }),
    );
    let url = spawn_fake(app).await;

    let backend = OllamaBackend::new("ollama", &url, "llama3", 5).unwrap();
    let err = backend.generate("q", OutputFormat::Json).await.unwrap_err();
    assert!(matches!(err, GatewayError::Empty { .. }), "{err:?}");
}

#[tokio::test]
async fn test_ollama_timeout_fires() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Json(json!({"response": "late"}))
        }),
    );
    let url = spawn_fake(app).await;

    let backend = OllamaBackend::new("ollama", &url, "llama3", 1).unwrap();
    let err = backend.generate("q", OutputFormat::Json).await.unwrap_err();
    assert!(
        matches!(err, GatewayError::Timeout { secs: 1, .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = OllamaBackend::new("ollama", &format!("http://{addr}"), "llama3", 5).unwrap();
    let err = backend.generate("q", OutputFormat::Json).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport { .. }), "{err:?}");
}

// ============================================================================
// OpenAI-compatible
// ============================================================================

async fn chat_handler(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"message": "bad key"}})));
    }
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["messages"][0]["role"], "user");

    (
        StatusCode::OK,
        Json(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"query\": \"SELECT * FROM Patients\"}"},
                "finish_reason": "stop"
            }]
        })),
    )
}

#[tokio::test]
async fn test_openai_returns_first_choice_content() {
    let url = spawn_fake(Router::new().route("/v1/chat/completions", post(chat_handler))).await;

    let backend = OpenAiBackend::new(
        "openai",
        &format!("{url}/v1/"),
        "gpt-4o-mini",
        Some("test-key".to_string()),
        5,
    )
    .unwrap();

    let raw = backend.generate("q", OutputFormat::Json).await.unwrap();
    assert_eq!(raw, r#"{"query": "SELECT * FROM Patients"}"#);
}

#[tokio::test]
async fn test_openai_bad_key_is_status_error_without_credentials() {
    let url = spawn_fake(Router::new().route("/v1/chat/completions", post(chat_handler))).await;

    let backend = OpenAiBackend::new(
        "openai",
        &format!("{url}/v1"),
        "gpt-4o-mini",
        Some("wrong-key".to_string()),
        5,
    )
    .unwrap();

    let err = backend.generate("q", OutputFormat::Json).await.unwrap_err();
    assert!(matches!(err, GatewayError::Status { status: 401, .. }), "{err:?}");
    assert!(!err.to_string().contains("wrong-key"));
}

#[tokio::test]
async fn test_openai_without_choices_is_envelope_error() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let url = spawn_fake(app).await;

    let backend = OpenAiBackend::new("router", &url, "m", None, 5).unwrap();
    let err = backend.generate("q", OutputFormat::Json).await.unwrap_err();
    assert!(matches!(err, GatewayError::Envelope { .. }), "{err:?}");
    assert_eq!(err.backend(), Some("router"));
}
