//! Local-process backend driven through `/bin/sh`.
#![cfg(unix)]

use std::time::{Duration, Instant};

use mcp_sql::gateway::{GatewayError, ModelBackend, OutputFormat, ProcessBackend};

/// `sh -c <script> sh ...`: the remaining argv becomes `$1`, `$2`, ...
fn sh(script: &str, rest: &[&str]) -> ProcessBackend {
    let mut args = vec!["-c".to_string(), script.to_string(), "sh".to_string()];
    args.extend(rest.iter().map(|s| s.to_string()));
    ProcessBackend::new("local", "sh").with_args(args)
}

#[tokio::test]
async fn test_stdout_is_the_raw_result() {
    let backend = sh(r#"printf '%s' '{"query": "SELECT 1"}'"#, &[]);
    let raw = backend.generate("ignored", OutputFormat::Json).await.unwrap();
    assert_eq!(raw, r#"{"query": "SELECT 1"}"#);
}

#[tokio::test]
async fn test_prompt_is_one_literal_argument() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("pwned");
    let prompt = format!("$(touch {0}); `touch {0}` && touch {0}", marker.display());

    let backend = sh(r#"printf '%s' "$1""#, &["{prompt}"]);
    let raw = backend.generate(&prompt, OutputFormat::Text).await.unwrap();

    assert_eq!(raw, prompt);
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_appended_prompt_follows_end_of_options() {
    let backend = sh(r#"printf '%s|%s' "$1" "$2""#, &[]);
    let raw = backend
        .generate("--help", OutputFormat::Text)
        .await
        .unwrap();
    assert_eq!(raw, "--|--help");
}

#[tokio::test]
async fn test_json_args_only_for_json_output() {
    let backend =
        sh(r#"printf '%s ' "$@""#, &["{prompt}"]).with_json_args(vec!["--json".to_string()]);

    let json = backend.generate("hi", OutputFormat::Json).await.unwrap();
    assert_eq!(json, "--json hi ");

    let text = backend.generate("hi", OutputFormat::Text).await.unwrap();
    assert_eq!(text, "hi ");
}

#[tokio::test]
async fn test_timeout_kills_the_generator() {
    let backend = sh("sleep 5", &[]).with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = backend.generate("q", OutputFormat::Json).await.unwrap_err();

    assert!(
        matches!(&err, GatewayError::Timeout { backend, .. } if backend == "local"),
        "{err:?}"
    );
    assert!(err.is_transport());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_non_zero_exit_is_transport_error_with_stderr() {
    let backend = sh("echo 'model not loaded' >&2; exit 3", &[]);
    let err = backend.generate("q", OutputFormat::Json).await.unwrap_err();

    match err {
        GatewayError::Transport { backend, message } => {
            assert_eq!(backend, "local");
            assert!(message.contains("model not loaded"), "{message}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_blank_output_is_empty_result() {
    let backend = sh("echo", &[]);
    let err = backend.generate("q", OutputFormat::Json).await.unwrap_err();
    assert!(matches!(err, GatewayError::Empty { .. }), "{err:?}");
}

#[tokio::test]
async fn test_missing_program_is_transport_error() {
    let backend = ProcessBackend::new("local", "/nonexistent/generator-binary");
    let err = backend.generate("q", OutputFormat::Json).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport { .. }), "{err:?}");
}

#[tokio::test]
async fn test_nul_in_prompt_is_refused_before_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let backend = sh(&format!("touch {}", marker.display()), &[]);

    let err = backend.generate("a\0b", OutputFormat::Json).await.unwrap_err();
    assert!(matches!(err, GatewayError::Config { .. }), "{err:?}");
    assert!(!marker.exists());
}
