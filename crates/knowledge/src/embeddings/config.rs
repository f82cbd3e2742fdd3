//! Embedding configuration and identity checks.

use serde::{Deserialize, Serialize};
use tripweave_core::config::EmbeddingSettings;
use tripweave_core::{AppError, AppResult};

/// Embedding configuration for building or querying a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "ollama", "openai", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Endpoint override
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from(&EmbeddingSettings::default())
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            endpoint: settings.endpoint.clone(),
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    /// Offline deterministic configuration, used by tests and dry runs.
    pub fn trigram(dimensions: usize) -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions,
            endpoint: None,
            batch_size: default_batch_size(),
        }
    }

    /// `provider/model/dimensions`, pinned into every store.
    pub fn identity(&self) -> String {
        format_identity(&self.provider, &self.model, self.dimensions)
    }

    /// Check that a store built with `stored_identity` can be queried with
    /// this configuration.
    pub fn validate_consistency(&self, stored_identity: &str) -> AppResult<()> {
        let (provider, model, dimensions) = parse_identity(stored_identity)?;

        if self.provider != provider {
            return Err(AppError::Knowledge(format!(
                "Provider mismatch: store built with '{}', configured '{}'. Re-run ingest.",
                provider, self.provider
            )));
        }

        if self.model != model {
            return Err(AppError::Knowledge(format!(
                "Model mismatch: store built with '{}', configured '{}'. Re-run ingest.",
                model, self.model
            )));
        }

        if self.dimensions != dimensions {
            return Err(AppError::Knowledge(format!(
                "Dimension mismatch: store has {}, configured {}. Re-run ingest.",
                dimensions, self.dimensions
            )));
        }

        Ok(())
    }
}

pub(crate) fn format_identity(provider: &str, model: &str, dimensions: usize) -> String {
    format!("{}/{}/{}", provider, model, dimensions)
}

/// Split an identity into provider, model and dimensions.
///
/// The model may itself contain `/` (e.g. `BAAI/bge-m3`).
pub fn parse_identity(identity: &str) -> AppResult<(&str, &str, usize)> {
    let invalid = || AppError::Knowledge(format!("Invalid embedding identity: '{}'", identity));

    let (provider, rest) = identity.split_once('/').ok_or_else(invalid)?;
    let (model, dims) = rest.rsplit_once('/').ok_or_else(invalid)?;
    let dimensions = dims.parse::<usize>().map_err(|_| invalid())?;

    Ok((provider, model, dimensions))
}
