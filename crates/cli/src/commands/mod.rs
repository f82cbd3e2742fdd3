//! Command handlers for the tripweave CLI.

pub mod ingest;
pub mod plan;
pub mod search;
pub mod stats;

pub use ingest::IngestCommand;
pub use plan::PlanCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;

use std::sync::Arc;
use tripweave_core::{config::AppConfig, AppResult};
use tripweave_knowledge::{create_provider, EmbeddingConfig, EmbeddingProvider};

/// Build the configured embedder.
pub(crate) fn embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let embedding = EmbeddingConfig::from(&config.embedding);
    tracing::debug!("Embedder: {}", embedding.identity());
    create_provider(&embedding, config.resolve_embedding_api_key().as_deref())
}

/// First `max` characters of `text` on one line.
pub(crate) fn snippet(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{}…", cut)
    }
}
