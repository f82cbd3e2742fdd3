//! Ollama LLM provider implementation.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tripweave_core::config::{DEFAULT_LLM_TIMEOUT_SECS, DEFAULT_OLLAMA_ENDPOINT};
use tripweave_core::{AppError, AppResult};

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// Per-request timeout
    timeout: Duration,

    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client for the default local endpoint.
    pub fn new() -> AppResult<Self> {
        Self::with_base_url(DEFAULT_OLLAMA_ENDPOINT)
    }

    /// Create a client for `base_url` with the default LLM timeout.
    pub fn with_base_url(base_url: impl Into<String>) -> AppResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS))
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            options,
            stream: false,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending completion request to Ollama (model: {})", request.model);

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::debug!(
            "Received {} chars from Ollama",
            ollama_response.response.chars().count()
        );

        Ok(LlmResponse {
            usage: LlmUsage::new(
                ollama_response.prompt_eval_count.unwrap_or(0),
                ollama_response.eval_count.unwrap_or(0),
            ),
            content: ollama_response.response,
            model: ollama_response.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new().unwrap();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.timeout(), Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS));
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new().unwrap();
        let request = LlmRequest::new("Hello", "qwen2.5")
            .with_temperature(0.7)
            .with_max_tokens(100);

        let ollama_req = client.to_ollama_request(&request);
        assert_eq!(ollama_req.model, "qwen2.5");
        assert_eq!(ollama_req.prompt, "Hello");
        assert!(!ollama_req.stream);
        assert_eq!(
            ollama_req.options,
            Some(OllamaOptions {
                temperature: Some(0.7),
                num_predict: Some(100),
            })
        );
    }

    #[tokio::test]
    async fn test_complete_reads_generate_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "qwen2.5",
                "response": "Day 1: 宽窄巷子",
                "done": true,
                "prompt_eval_count": 12,
                "eval_count": 8
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(server.uri()).unwrap();
        let response = client
            .complete(&LlmRequest::new("plan", "qwen2.5"))
            .await
            .unwrap();

        assert_eq!(response.content, "Day 1: 宽窄巷子");
        assert_eq!(response.usage.total_tokens, 20);
    }

    #[tokio::test]
    async fn test_complete_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(server.uri()).unwrap();
        let err = client
            .complete(&LlmRequest::new("plan", "missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(ref msg) if msg.contains("model not found")));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"model": "qwen2.5", "response": "late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::with_timeout(server.uri(), Duration::from_millis(200)).unwrap();
        let err = client
            .complete(&LlmRequest::new("plan", "qwen2.5"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(_)));
    }
}
