//! OpenAI API backend implementation.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use choicebench_core::model::{ModelConfig, Vendor};
use choicebench_core::traits::{Backend, PromptRequest};

use crate::error::{status_error, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible chat completions backend.
pub struct OpenAiBackend {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(api_key: &str, base_url: Option<String>, org_id: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            client,
        })
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    /// Omitted for models that only accept the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn vendor(&self) -> Vendor {
        Vendor::OpenAi
    }

    #[instrument(skip(self, config, request), fields(model = %config.model_id()))]
    async fn invoke(&self, config: &ModelConfig, request: &PromptRequest) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey("openai").into());
        }

        let body = OpenAiRequest {
            model: config.model_id(),
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                OpenAiMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: config.parameters.temperature,
            max_tokens: config.parameters.max_tokens,
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_send(e, DEFAULT_TIMEOUT_SECS))?;

        if !response.status().is_success() {
            return Err(status_error(response, config.model_id()).await.into());
        }

        let api_response: OpenAiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ProviderError::EmptyResponse("openai"))?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> PromptRequest {
        PromptRequest {
            system_prompt: "Answer with a number.".into(),
            user_prompt: "Question 1: ...".into(),
        }
    }

    #[tokio::test]
    async fn successful_completion() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "choices": [{"message": {"content": "  3\n", "role": "assistant"}, "index": 0}],
            "model": "gpt-4o-2024-11-20"
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-2024-11-20",
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": "Answer with a number."},
                    {"role": "user", "content": "Question 1: ..."}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("test-key", Some(server.uri()), None).unwrap();
        let config = ModelConfig::new("gpt-4o-2024-11-20", Vendor::OpenAi).with_temperature(0.0);

        let text = backend.invoke(&config, &request()).await.unwrap();
        assert_eq!(text, "3");
    }

    #[tokio::test]
    async fn temperature_omitted_when_unset() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "1"}}]
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("key", Some(server.uri()), None).unwrap();
        let config = ModelConfig::new("o3-mini-2025-01-31", Vendor::OpenAi);
        backend.invoke(&config, &request()).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert!(sent.get("temperature").is_none());
        assert_eq!(sent["model"], "o3-mini-2025-01-31");
    }

    #[tokio::test]
    async fn error_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("key", Some(server.uri()), None).unwrap();
        let config = ModelConfig::new("gpt-4o", Vendor::OpenAi);

        let err = backend.invoke(&config, &request()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new("key", Some(server.uri()), None).unwrap();
        let config = ModelConfig::new("gpt-4o", Vendor::OpenAi);

        let err = backend.invoke(&config, &request()).await.unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let backend = OpenAiBackend::new("", Some("http://127.0.0.1:9".into()), None).unwrap();
        let config = ModelConfig::new("gpt-4o", Vendor::OpenAi);

        let err = backend.invoke(&config, &request()).await.unwrap_err();
        assert!(err.to_string().contains("missing API key"));
    }
}
