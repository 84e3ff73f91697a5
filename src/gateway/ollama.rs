//! Ollama backend (`POST /api/generate`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{GatewayError, GatewayResult};
use super::{non_empty, ModelBackend, OutputFormat};
use crate::config::BackendSettings;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Single-shot, non-streaming Ollama generation.
pub struct OllamaBackend {
    name: String,
    client: Client,
    endpoint: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaBackend {
    pub fn new(
        name: impl Into<String>,
        endpoint: &str,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> GatewayResult<Self> {
        let name = name.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::config(&name, format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: normalize_endpoint(endpoint),
            model: model.into(),
            timeout_secs,
            name,
        })
    }

    pub fn from_settings(name: &str, settings: &BackendSettings) -> GatewayResult<Self> {
        match settings {
            BackendSettings::Ollama {
                endpoint,
                model,
                timeout_secs,
            } => Self::new(name, endpoint, model.clone(), *timeout_secs),
            _ => Err(GatewayError::config(name, "not an ollama backend")),
        }
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, format: OutputFormat) -> GatewayResult<String> {
        let url = format!("{}/api/generate", self.endpoint);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            format: matches!(format, OutputFormat::Json).then_some("json"),
            stream: false,
        };

        debug!(backend = %self.name, model = %self.model, "calling ollama");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::http(&self.name, self.timeout_secs, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::http(&self.name, self.timeout_secs, e))?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                backend: self.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::envelope(&self.name, e.to_string(), body.clone()))?;

        non_empty(&self.name, envelope.response)
    }
}

/// Add a scheme when missing and drop trailing slashes.
pub(crate) fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    let endpoint = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    };
    endpoint.trim_end_matches('/').to_string()
}
