//! LLM integration crate for tripweave.
//!
//! Provider-agnostic access to generative models through the [`LlmClient`]
//! trait.
//!
//! # Providers
//! - **OpenAI-compatible**: any `/chat/completions` endpoint (Qianfan by default)
//! - **Ollama**: local LLM runtime
//!
//! # Example
//! ```no_run
//! use tripweave_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new()?;
//! let request = LlmRequest::new("Plan a weekend in Chengdu", "qwen2.5");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_client_from_config};
pub use providers::{OllamaClient, OpenAiCompatClient};
pub use types::ProviderType;
