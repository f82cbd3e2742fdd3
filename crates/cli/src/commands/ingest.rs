//! Ingest command handler.
//!
//! Builds the vector store from a directory of CSV exports.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tripweave_core::{config::AppConfig, AppResult};
use tripweave_knowledge::chunker::DEFAULT_MAX_TOKENS;
use tripweave_knowledge::{IngestOptions, ProgressReporter, VibeExtractor};
use tripweave_llm::create_client_from_config;
use tripweave_prompt::{load_prompt, VIBES_EXTRACT};

/// Build the knowledge store from CSV travel narratives
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Directory scanned recursively for *.csv
    #[arg(long)]
    pub data: PathBuf,

    /// Store directory (default: from config, .tripweave/store)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Maximum whitespace tokens per chunk
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: usize,

    /// Skip LLM vibe tagging
    #[arg(long)]
    pub no_vibes: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {:?}", self.data);

        let embedder = super::embedder(config)?;
        let store_dir = self.store.clone().unwrap_or_else(|| config.store_dir());

        let mut options = IngestOptions::new(&self.data, store_dir);
        options.max_tokens = self.max_tokens;
        options.batch_size = tripweave_knowledge::EmbeddingConfig::from(&config.embedding).batch_size;

        let extractor = if self.no_vibes {
            None
        } else {
            match create_client_from_config(config) {
                Ok(client) => {
                    let prompt = load_prompt(&config.workspace, VIBES_EXTRACT)?;
                    Some(VibeExtractor::new(client, config.model.clone(), prompt))
                }
                Err(e) => {
                    tracing::warn!("Vibe tagging disabled, no LLM client: {}", e);
                    None
                }
            }
        };

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event| eprintln!("{}", event.format_simple())))
        };

        let stats =
            tripweave_knowledge::ingest(&options, embedder, extractor.as_ref(), &progress).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Ingested {} files: {} records ({} skipped), {} chunks, {} cities with vibes in {:.2}s",
                stats.files,
                stats.records,
                stats.skipped_records,
                stats.chunks,
                stats.cities,
                stats.duration_secs
            );
            println!("Store: {}", options.store_dir.display());
        }

        Ok(())
    }
}
