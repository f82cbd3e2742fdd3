//! Stats command handler.

use clap::Args;
use tripweave_core::{config::AppConfig, AppResult};

/// Show statistics of the persisted store
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let stats = tripweave_knowledge::store_stats(&config.store_dir())?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Store: {}", stats.store_dir.display());
            println!("  Chunks: {}", stats.chunks);
            println!("  Embedding: {}", stats.identity);
            println!("  Built at: {}", stats.built_at);
            println!("  Size: {} bytes", stats.size_bytes);
            if stats.cities.is_empty() {
                println!("  Cities: (none inferred)");
            } else {
                println!("  Cities: {}", stats.cities.join(", "));
            }
            println!("  Cities with vibes: {}", stats.vibe_cities);
        }

        Ok(())
    }
}
