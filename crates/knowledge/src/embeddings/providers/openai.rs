//! OpenAI-compatible embedding provider (`POST {base}/embeddings`).

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::provider::{check_dimensions, EmbeddingProvider};
use crate::embeddings::providers::ollama::REQUEST_TIMEOUT_SECS;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;
use tripweave_core::config::DEFAULT_OPENAI_ENDPOINT;
use tripweave_core::{AppError, AppResult};

#[derive(Debug)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_ENDPOINT)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send embeddings request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Embeddings API error ({}): {}",
                status, error_text
            )));
        }

        let mut body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse embeddings response: {}", e)))?;

        if body.data.len() != texts.len() {
            return Err(AppError::Llm(format!(
                "Embeddings API returned {} vectors for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }

        body.data.sort_by_key(|item| item.index);
        let embeddings: Vec<Vec<f32>> = body.data.into_iter().map(|item| item.embedding).collect();
        check_dimensions(&embeddings, self.dimensions)?;

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(endpoint: &str) -> OpenAiProvider {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            model: "embedding-v1".to_string(),
            dimensions: 2,
            endpoint: Some(endpoint.to_string()),
            batch_size: 16,
        };
        OpenAiProvider::new(&config, "secret").unwrap()
    }

    #[tokio::test]
    async fn test_embed_batch_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .mount(&server)
            .await;

        let embeddings = provider(&server.uri())
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [1.0, 0.0]}]
            })))
            .mount(&server)
            .await;

        let result = provider(&server.uri())
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }
}
