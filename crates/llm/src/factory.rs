//! LLM provider factory.
//!
//! Builds a client from a provider name or from the application config,
//! resolving endpoints, timeouts and secrets along the way.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiCompatClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;
use tripweave_core::config::{
    DEFAULT_LLM_TIMEOUT_SECS, DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OPENAI_ENDPOINT,
};
use tripweave_core::{AppConfig, AppError, AppResult};

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required for OpenAI-compatible endpoints
/// * `timeout` - Per-request timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    match ProviderType::parse(provider) {
        Some(ProviderType::Ollama) => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_ENDPOINT);
            Ok(Arc::new(OllamaClient::with_timeout(base_url, timeout)?))
        }
        Some(ProviderType::OpenAI) => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI-compatible provider requires API key".to_string())
            })?;
            let base_url = endpoint.unwrap_or(DEFAULT_OPENAI_ENDPOINT);
            Ok(Arc::new(OpenAiCompatClient::with_base_url(
                base_url, api_key, timeout,
            )?))
        }
        None => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

/// Create the client for the active provider of `config`.
pub fn create_client_from_config(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = provider_config.and_then(|p| p.endpoint());
    let timeout = provider_config
        .map(|p| p.timeout_secs())
        .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);
    let api_key = config.resolve_api_key(&config.provider);

    tracing::debug!(
        "Creating {} client (endpoint: {})",
        config.provider,
        endpoint.unwrap_or("default")
    );

    create_client(
        &config.provider,
        endpoint,
        api_key.as_deref(),
        Duration::from_secs(timeout),
    )
}
