//! Search command handler.

use clap::Args;
use tripweave_core::{config::AppConfig, AppResult};
use tripweave_knowledge::Retriever;

/// Nearest-neighbour search over the store
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long, default_value_t = 5)]
    pub top_k: usize,

    /// Prefer chunks from this city
    #[arg(long)]
    pub city: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let retriever = Retriever::load(&config.store_dir(), super::embedder(config)?)?;
        let results = retriever
            .search_in_city(&self.query, self.top_k, self.city.as_deref())
            .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
            return Ok(());
        }

        if results.is_empty() {
            println!("No results.");
            return Ok(());
        }

        for (i, result) in results.iter().enumerate() {
            let meta = &result.metadata;
            println!("{}. [{:.4}] {}", i + 1, result.score, meta.display_title());
            if !meta.city.is_empty() {
                println!("   city: {}", meta.city);
            }
            if !meta.url.is_empty() {
                println!("   {}", meta.url);
            }
            if !meta.vibes.is_empty() {
                println!("   vibes: {}", meta.vibes.join(", "));
            }
            println!("   {}", super::snippet(&result.chunk, 160));
        }

        let vibes = retriever.vibes_for(&results, self.city.as_deref());
        if !vibes.is_empty() {
            println!();
            println!("Vibes: {}", vibes.join(", "));
        }

        Ok(())
    }
}
