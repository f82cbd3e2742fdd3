//! Plan command handler.
//!
//! Retrieves travel narratives for a request and asks the configured LLM for
//! a grounded day-by-day itinerary.

use clap::Args;
use std::sync::Arc;
use tripweave_core::{config::AppConfig, AppResult};
use tripweave_knowledge::{parse_itinerary, Retriever, Synthesizer};
use tripweave_llm::create_client_from_config;
use tripweave_prompt::{load_prompt, ITINERARY_PLAN};

/// Generate a multi-day itinerary
#[derive(Args, Debug)]
pub struct PlanCommand {
    /// Travel request, e.g. "3 days of food and night views in Chengdu"
    pub request: String,

    /// Number of days (clamped to 1-7)
    #[arg(long, default_value_t = 3)]
    pub days: i64,

    /// Number of sources to retrieve
    #[arg(short = 'k', long, default_value_t = 5)]
    pub top_k: usize,

    /// Prefer sources from this city
    #[arg(long)]
    pub city: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PlanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing plan command");
        config.validate()?;

        let retriever = Arc::new(Retriever::load(
            &config.store_dir(),
            super::embedder(config)?,
        )?);
        let client = create_client_from_config(config)?;
        let prompt = load_prompt(&config.workspace, ITINERARY_PLAN)?;

        let synthesizer = Synthesizer::new(retriever, client, config.model.clone(), prompt);
        let answer = synthesizer
            .generate_answer(&self.request, self.days, self.top_k, self.city.as_deref())
            .await?;

        let itinerary = parse_itinerary(&answer.text);
        let favorites = itinerary.favorite_candidates();

        if self.json {
            let output = serde_json::json!({
                "answer": answer.text,
                "days": answer.days,
                "vibes": answer.vibes,
                "itinerary": itinerary,
                "favorites": favorites,
                "sources": answer.used_results,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("{}", answer.text.trim());
        println!();

        if favorites.is_empty() {
            println!("Favoritable slots: (none found)");
        } else {
            println!("Favoritable slots:");
            for day in itinerary.days.iter().filter(|d| !d.slots.is_empty()) {
                println!("  {}", day.label);
                for slot in &day.slots {
                    println!("    {}: {}", slot.time.label_zh(), slot.text);
                }
            }
        }
        println!();

        if answer.used_results.is_empty() {
            println!("Sources: (no sources available)");
        } else {
            println!("Sources:");
            for (i, result) in answer.used_results.iter().enumerate() {
                println!(
                    "[{}] {} {}",
                    i + 1,
                    result.metadata.display_title(),
                    result.metadata.url
                );
            }
        }

        Ok(())
    }
}
