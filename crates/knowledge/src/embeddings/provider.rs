//! Embedding provider trait and factory.

use crate::embeddings::config::{format_identity, EmbeddingConfig};
use crate::embeddings::providers::{ollama::OllamaProvider, openai::OpenAiProvider, trigram::TrigramProvider};
use std::sync::Arc;
use tripweave_core::{AppError, AppResult};

/// Trait for embedding providers.
///
/// `embed(text)` must equal the single row of `embed_batch(&[text])`.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "ollama", "openai", "trigram")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }

    /// `provider/model/dimensions` of this embedder.
    fn identity(&self) -> String {
        format_identity(self.provider_name(), self.model_name(), self.dimensions())
    }
}

/// Ensure every vector has the expected length.
pub(crate) fn check_dimensions(vectors: &[Vec<f32>], expected: usize) -> AppResult<()> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(bad) => Err(AppError::Llm(format!(
            "Unexpected embedding dimensions: got {}, expected {}",
            bad.len(),
            expected
        ))),
        None => Ok(()),
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    match config.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(config.dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),

        "openai" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI-compatible embeddings require an API key".to_string())
            })?;
            Ok(Arc::new(OpenAiProvider::new(config, api_key)?))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, openai, trigram",
            config.provider
        ))),
    }
}
