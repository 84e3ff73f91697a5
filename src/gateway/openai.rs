//! OpenAI-compatible chat completions backend (OpenAI, OpenRouter, ...).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{GatewayError, GatewayResult};
use super::ollama::normalize_endpoint;
use super::{non_empty, ModelBackend, OutputFormat};
use crate::config::{expand_env_vars, BackendSettings};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions backend. The bearer token comes from configuration.
pub struct OpenAiBackend {
    name: String,
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl OpenAiBackend {
    pub fn new(
        name: impl Into<String>,
        endpoint: &str,
        model: impl Into<String>,
        api_key: Option<String>,
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
            api_key,
            timeout_secs,
            name,
        })
    }

    /// Build from settings, expanding `${VAR}` in the key.
    pub fn from_settings(name: &str, settings: &BackendSettings) -> GatewayResult<Self> {
        let BackendSettings::Openai {
            endpoint,
            model,
            api_key,
            timeout_secs,
        } = settings
        else {
            return Err(GatewayError::config(name, "not an openai backend"));
        };

        let api_key = api_key
            .as_deref()
            .map(expand_env_vars)
            .transpose()
            .map_err(|e| GatewayError::config(name, e.to_string()))?
            .filter(|key| !key.is_empty());

        Self::new(name, endpoint, model.clone(), api_key, *timeout_secs)
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, format: OutputFormat) -> GatewayResult<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: matches!(format, OutputFormat::Json).then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        debug!(backend = %self.name, model = %self.model, "calling chat completions");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
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

        let envelope: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::envelope(&self.name, e.to_string(), body.clone()))?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::envelope(&self.name, "no choices in response", body.clone()))?
            .message
            .content
            .unwrap_or_default();

        non_empty(&self.name, content)
    }
}
