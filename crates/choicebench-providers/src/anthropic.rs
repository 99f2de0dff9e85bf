//! Anthropic API backend implementation.
//!
//! The system instruction and the question travel together as a single
//! user message.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use choicebench_core::model::{ModelConfig, Vendor};
use choicebench_core::traits::{Backend, PromptRequest};

use crate::error::{status_error, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_TOKENS: u32 = 10;

/// Anthropic messages API backend.
pub struct AnthropicBackend {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: &str, base_url: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client,
        })
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn vendor(&self) -> Vendor {
        Vendor::Anthropic
    }

    #[instrument(skip(self, config, request), fields(model = %config.model_id()))]
    async fn invoke(&self, config: &ModelConfig, request: &PromptRequest) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey("anthropic").into());
        }

        let body = AnthropicRequest {
            model: config.model_id(),
            max_tokens: config.parameters.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.parameters.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: format!("{}\n\n{}", request.system_prompt, request.user_prompt),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_send(e, DEFAULT_TIMEOUT_SECS))?;

        if !response.status().is_success() {
            let err = match status_error(response, config.model_id()).await {
                ProviderError::ApiError { status, message } => ProviderError::ApiError {
                    status,
                    message: serde_json::from_str::<AnthropicError>(&message)
                        .map(|e| e.error.message)
                        .unwrap_or(message),
                },
                other => other,
            };
            return Err(err.into());
        }

        let api_response: AnthropicResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let content = api_response
            .content
            .into_iter()
            .next()
            .and_then(|c| c.text)
            .ok_or(ProviderError::EmptyResponse("anthropic"))?;

        Ok(content.trim().to_string())
    }
}
