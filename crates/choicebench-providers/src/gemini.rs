//! Google Gemini backend implementation.
//!
//! Only the question prompt is sent as content; sampling options travel in
//! `generationConfig`.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use choicebench_core::model::{ModelConfig, Vendor};
use choicebench_core::traits::{Backend, PromptRequest};

use crate::error::{status_error, ProviderError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 10;

/// Gemini `generateContent` backend.
pub struct GeminiBackend {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiBackend {
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
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl Backend for GeminiBackend {
    fn vendor(&self) -> Vendor {
        Vendor::Gemini
    }

    #[instrument(skip(self, config, request), fields(model = %config.model_id()))]
    async fn invoke(&self, config: &ModelConfig, request: &PromptRequest) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey("gemini").into());
        }

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart {
                    text: &request.user_prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: config.parameters.temperature,
                max_output_tokens: config
                    .parameters
                    .max_tokens
                    .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url,
                config.model_id()
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_send(e, DEFAULT_TIMEOUT_SECS))?;

        if !response.status().is_success() {
            return Err(status_error(response, config.model_id()).await.into());
        }

        let api_response: GeminiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let text: String = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse("gemini").into());
        }
        Ok(text.trim().to_string())
    }
}
