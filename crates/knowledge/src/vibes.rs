//! Vibe tag extraction and per-city aggregation.
//!
//! Each corpus record gets a handful of short atmosphere tags from one LLM
//! call. Tags are then counted per city into a [`CityVibeSummary`] that is
//! persisted next to the vector store and read at query time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tripweave_core::{AppError, AppResult};
use tripweave_llm::{LlmClient, LlmRequest};
use tripweave_prompt::{build_prompt, PromptDefinition};
use unicode_segmentation::UnicodeSegmentation;

/// Maximum characters of title + body sent for extraction.
pub const EXCERPT_CHAR_BUDGET: usize = 600;

/// Maximum tags kept per record.
pub const MAX_TAGS: usize = 10;

/// Tags kept per city in the persisted summary.
pub const SUMMARY_TOP_N: usize = 15;

/// Default timeout for one extraction call.
pub const VIBE_TIMEOUT: Duration = Duration::from_secs(20);

/// Truncate `text` to at most `max_chars` grapheme clusters.
pub(crate) fn truncate_graphemes(text: &str, max_chars: usize) -> &str {
    match text.grapheme_indices(true).nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Parse an LLM reply into a tag list.
///
/// Accepts a bare JSON string array or one wrapped in prose or a code fence.
/// Returns `None` when no array can be decoded.
pub fn parse_tags(reply: &str) -> Option<Vec<String>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end < start {
        return None;
    }

    let raw: Vec<String> = serde_json::from_str(&reply[start..=end]).ok()?;
    let mut tags: Vec<String> = Vec::with_capacity(raw.len().min(MAX_TAGS));
    for tag in raw {
        let tag = tag.trim();
        if tag.is_empty() || tags.iter().any(|t| t == tag) {
            continue;
        }
        tags.push(tag.to_string());
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    Some(tags)
}

/// LLM-backed vibe tag extractor.
pub struct VibeExtractor {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    timeout: Duration,
}

impl VibeExtractor {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
            timeout: VIBE_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract tags for one record.
    ///
    /// Never fails: any error or unparseable reply yields an empty list.
    pub async fn extract(&self, title: &str, body: &str, city: &str) -> Vec<String> {
        match self.try_extract(title, body, city).await {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!("Vibe extraction failed for {:?}: {}", title, e);
                Vec::new()
            }
        }
    }

    async fn try_extract(&self, title: &str, body: &str, city: &str) -> AppResult<Vec<String>> {
        let excerpt = format!("{}\n{}", title.trim(), body.trim());
        let excerpt = truncate_graphemes(excerpt.trim(), EXCERPT_CHAR_BUDGET);

        let mut vars = HashMap::new();
        vars.insert("title".to_string(), title.trim().to_string());
        vars.insert("excerpt".to_string(), excerpt.to_string());
        vars.insert("city".to_string(), city.to_string());
        let built = build_prompt(&self.prompt, &vars)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(0.2)
            .with_max_tokens(200);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = tokio::time::timeout(self.timeout, self.client.complete(&request))
            .await
            .map_err(|_| AppError::Llm(format!("timed out after {:?}", self.timeout)))??;

        parse_tags(&response.content).ok_or_else(|| {
            AppError::Serialization(format!(
                "reply is not a JSON string array: {}",
                truncate_graphemes(&response.content, 80)
            ))
        })
    }
}

/// Ranked tags and full counts for one city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityVibes {
    pub top_tags: Vec<String>,

    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
}

/// City key → ranked vibe tags, as persisted in `city_vibes.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityVibeSummary {
    cities: BTreeMap<String, CityVibes>,
}

impl CityVibeSummary {
    /// Load a summary; a missing file yields an empty summary.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No vibe summary at {:?}", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Knowledge(format!("Failed to read vibe summary {:?}: {}", path, e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the summary as pretty UTF-8 JSON.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| {
            AppError::Knowledge(format!("Failed to write vibe summary {:?}: {}", path, e))
        })
    }

    /// Ranked tags for `city` (case-insensitive); empty if unknown.
    pub fn top_tags(&self, city: &str) -> &[String] {
        self.cities
            .get(&city_key(city))
            .map(|v| v.top_tags.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, city: &str) -> Option<&CityVibes> {
        self.cities.get(&city_key(city))
    }

    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.cities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

fn city_key(city: &str) -> String {
    city.trim().to_lowercase()
}

/// Frequency counter that remembers first-seen order.
#[derive(Debug, Clone, Default)]
pub(crate) struct TagCounter {
    order: Vec<String>,
    counts: HashMap<String, usize>,
}

impl TagCounter {
    pub(crate) fn add(&mut self, tag: &str) {
        match self.counts.get_mut(tag) {
            Some(count) => *count += 1,
            None => {
                self.order.push(tag.to_string());
                self.counts.insert(tag.to_string(), 1);
            }
        }
    }

    /// Tags by descending count, ties in first-seen order.
    pub(crate) fn ranked(&self) -> Vec<String> {
        let mut ranked: Vec<&String> = self.order.iter().collect();
        // stable: equal counts keep insertion order
        ranked.sort_by(|a, b| self.counts[*b].cmp(&self.counts[*a]));
        ranked.into_iter().cloned().collect()
    }
}

/// Accumulates record tags per city during ingestion.
#[derive(Debug, Default)]
pub struct VibeAggregator {
    cities: HashMap<String, TagCounter>,
}

impl VibeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `tags` under `city`. Blank cities are ignored.
    pub fn add(&mut self, city: &str, tags: &[String]) {
        let key = city_key(city);
        if key.is_empty() || tags.is_empty() {
            return;
        }

        let counter = self.cities.entry(key).or_default();
        for tag in tags {
            counter.add(tag);
        }
    }

    /// Build the summary keeping the `top_n` most frequent tags per city.
    pub fn summary(&self, top_n: usize) -> CityVibeSummary {
        let cities = self
            .cities
            .iter()
            .map(|(city, counter)| {
                let mut top_tags = counter.ranked();
                top_tags.truncate(top_n);
                let counts = counter
                    .counts
                    .iter()
                    .map(|(tag, n)| (tag.clone(), *n))
                    .collect();
                (city.clone(), CityVibes { top_tags, counts })
            })
            .collect();

        CityVibeSummary { cities }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tripweave_llm::{LlmResponse, LlmUsage};

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    struct CannedClient {
        reply: Option<String>,
    }

    #[async_trait::async_trait]
    impl LlmClient for CannedClient {
        fn provider_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            match &self.reply {
                Some(reply) => Ok(LlmResponse {
                    content: reply.clone(),
                    model: request.model.clone(),
                    usage: LlmUsage::default(),
                }),
                None => Err(AppError::Llm("backend down".to_string())),
            }
        }
    }

    fn extractor(reply: Option<&str>) -> VibeExtractor {
        let prompt =
            tripweave_prompt::load_prompt(Path::new("/nonexistent"), tripweave_prompt::VIBES_EXTRACT)
                .unwrap();
        VibeExtractor::new(
            Arc::new(CannedClient {
                reply: reply.map(str::to_string),
            }),
            "test-model",
            prompt,
        )
    }

    #[test]
    fn test_parse_tags_plain_array() {
        assert_eq!(parse_tags(r#"["浪漫", "美食"]"#), Some(tags(&["浪漫", "美食"])));
    }

    #[test]
    fn test_parse_tags_inside_fence() {
        let reply = "好的：\n```json\n[\" 夜景 \", \"\", \"夜景\", \"慢生活\"]\n```";
        assert_eq!(parse_tags(reply), Some(tags(&["夜景", "慢生活"])));
    }

    #[test]
    fn test_parse_tags_caps_count() {
        let many: Vec<String> = (0..15).map(|i| format!("t{}", i)).collect();
        let reply = serde_json::to_string(&many).unwrap();
        assert_eq!(parse_tags(&reply).unwrap().len(), MAX_TAGS);
    }

    #[test]
    fn test_parse_tags_rejects_non_arrays() {
        assert_eq!(parse_tags("浪漫, 美食"), None);
        assert_eq!(parse_tags("[1, 2]"), None);
        assert_eq!(parse_tags("] oops ["), None);
    }

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate_graphemes("成都火锅", 2), "成都");
        assert_eq!(truncate_graphemes("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_extract_success() {
        let extractor = extractor(Some(r#"["美食", "烟火气"]"#));
        let result = extractor.extract("成都", "火锅和茶馆", "chengdu").await;
        assert_eq!(result, tags(&["美食", "烟火气"]));
    }

    #[tokio::test]
    async fn test_extract_failures_yield_empty() {
        assert!(extractor(None).extract("t", "b", "").await.is_empty());
        assert!(extractor(Some("no tags here"))
            .extract("t", "b", "")
            .await
            .is_empty());
    }

    #[test]
    fn test_aggregation_ranks_by_frequency_then_first_seen() {
        let mut agg = VibeAggregator::new();
        agg.add("Paris", &tags(&["浪漫", "美食"]));
        agg.add(" paris ", &tags(&["浪漫"]));
        agg.add("PARIS", &tags(&["夜景"]));

        let summary = agg.summary(SUMMARY_TOP_N);
        assert_eq!(summary.top_tags("paris"), tags(&["浪漫", "美食", "夜景"]).as_slice());
        assert_eq!(summary.get("Paris").unwrap().counts["浪漫"], 2);
    }

    #[test]
    fn test_aggregation_skips_blank_city_and_truncates() {
        let mut agg = VibeAggregator::new();
        agg.add("", &tags(&["ignored"]));
        agg.add("kyoto", &tags(&["a", "b", "c"]));

        let summary = agg.summary(2);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.top_tags("kyoto").len(), 2);
        assert_eq!(summary.get("kyoto").unwrap().counts.len(), 3);
    }

    #[test]
    fn test_summary_save_load_and_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("city_vibes.json");

        assert!(CityVibeSummary::load(&path).unwrap().is_empty());

        let mut agg = VibeAggregator::new();
        agg.add("chengdu", &tags(&["美食"]));
        let summary = agg.summary(SUMMARY_TOP_N);
        summary.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"chengdu\""));
        assert!(raw.contains("美食"));
        assert!(raw.contains("top_tags"));
        assert_eq!(CityVibeSummary::load(&path).unwrap(), summary);
    }
}
