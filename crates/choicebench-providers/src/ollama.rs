//! Ollama (local LLM) backend implementation.
//!
//! Uses the raw completion endpoint: the question prompt is self-contained
//! and no system message is sent. Local servers handle requests one at a
//! time, so the registry normally wraps this backend in a limiter.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use choicebench_core::model::{ModelConfig, Vendor};
use choicebench_core::traits::{Backend, PromptRequest};

use crate::error::{status_error, ProviderError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 300; // Local models are slower

/// Ollama local completion backend.
pub struct OllamaBackend {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl Backend for OllamaBackend {
    fn vendor(&self) -> Vendor {
        Vendor::Ollama
    }

    #[instrument(skip(self, config, request), fields(model = %config.model_id()))]
    async fn invoke(&self, config: &ModelConfig, request: &PromptRequest) -> anyhow::Result<String> {
        let body = OllamaRequest {
            model: config.model_id(),
            prompt: &request.user_prompt,
            stream: false,
            options: config
                .parameters
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else if e.is_connect() {
                    ProviderError::NetworkError(format!(
                        "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                        self.base_url
                    ))
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        if response.status().as_u16() == 404 {
            return Err(ProviderError::ModelNotFound(format!(
                "Model '{}' not found locally. Pull it with: ollama pull {}",
                config.model_id(),
                config.model_id()
            ))
            .into());
        }
        if !response.status().is_success() {
            return Err(status_error(response, config.model_id()).await.into());
        }

        let api_response: OllamaResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        Ok(api_response.response.trim().to_string())
    }
}
