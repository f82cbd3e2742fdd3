//! Grounded itinerary generation.
//!
//! Retrieves context for a travel request, merges vibe keywords, renders the
//! `itinerary.plan` prompt and makes one generation call.

use crate::retriever::Retriever;
use crate::types::RetrievalResult;
use crate::vibes::truncate_graphemes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tripweave_core::AppResult;
use tripweave_llm::{LlmClient, LlmRequest};
use tripweave_prompt::{build_prompt, PromptDefinition};

/// Maximum characters of each chunk placed in the context block.
pub const CONTEXT_CHAR_BUDGET: usize = 800;

pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 7;

const TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_TOKENS: u32 = 800;

/// Clamp a requested day count into `[MIN_DAYS, MAX_DAYS]`.
pub fn clamp_days(days: i64) -> u32 {
    days.clamp(MIN_DAYS as i64, MAX_DAYS as i64) as u32
}

/// Render results as numbered, labelled context entries.
pub fn build_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "[{}] 来源: {}\n链接: {}\n片段: {}",
                i + 1,
                result.metadata.display_title(),
                result.metadata.url,
                truncate_graphemes(result.chunk.trim(), CONTEXT_CHAR_BUDGET)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A generated itinerary and what it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Raw generated text
    pub text: String,

    /// Exactly the results shown to the model, in context order
    pub used_results: Vec<RetrievalResult>,

    /// Day count after clamping
    pub days: u32,

    /// Vibe keywords given to the model
    pub vibes: Vec<String>,
}

/// Turns travel requests into itineraries.
pub struct Synthesizer {
    retriever: Arc<Retriever>,
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    max_tokens: u32,
}

impl Synthesizer {
    pub fn new(
        retriever: Arc<Retriever>,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
    ) -> Self {
        Self {
            retriever,
            client,
            model: model.into(),
            prompt,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Retrieve, then generate a `days`-day itinerary for `question`.
    ///
    /// Generation failures propagate.
    pub async fn generate_answer(
        &self,
        question: &str,
        days: i64,
        top_k: usize,
        city: Option<&str>,
    ) -> AppResult<Answer> {
        let days = clamp_days(days);
        let results = self.retriever.search_in_city(question, top_k, city).await?;
        let vibes = self.retriever.vibes_for(&results, city);

        tracing::info!(
            "Generating {}-day itinerary from {} sources (vibes: {})",
            days,
            results.len(),
            vibes.join(", ")
        );

        self.synthesize(question, days, vibes, results).await
    }

    /// Generate from already retrieved results.
    pub async fn synthesize(
        &self,
        question: &str,
        days: u32,
        vibes: Vec<String>,
        results: Vec<RetrievalResult>,
    ) -> AppResult<Answer> {
        let days = clamp_days(days as i64);
        let vibe_line = if vibes.is_empty() {
            "无".to_string()
        } else {
            vibes.join("、")
        };

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.trim().to_string());
        vars.insert("days".to_string(), days.to_string());
        vars.insert("vibes".to_string(), vibe_line);
        vars.insert("context".to_string(), build_context(&results));
        let built = build_prompt(&self.prompt, &vars)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(TEMPERATURE)
            .with_max_tokens(self.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.client.complete(&request).await?;
        tracing::debug!(
            "Generated {} chars with {} ({} tokens)",
            response.content.chars().count(),
            self.client.provider_name(),
            response.usage.total_tokens
        );

        Ok(Answer {
            text: response.content,
            used_results: results,
            days,
            vibes,
        })
    }
}
