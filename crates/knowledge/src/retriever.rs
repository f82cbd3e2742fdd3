//! Query-time retrieval over a persisted store.
//!
//! [`Retriever`] owns a loaded store, its city vibe summary and the embedder
//! that must match the store's embedding identity. [`StoreHandle`] defers the
//! load to first use and then shares the same instance.

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use crate::store::{VectorStore, VIBES_FILE};
use crate::types::RetrievalResult;
use crate::vibes::{CityVibeSummary, TagCounter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tripweave_core::AppResult;

/// Maximum vibe keywords handed to generation.
pub const VIBE_DISPLAY_CAP: usize = 8;

/// Over-fetch factor applied before city filtering.
pub const CITY_OVERFETCH: usize = 4;

/// Keep results whose city matches `city` (trimmed, case-insensitive).
///
/// If nothing matches, or `city` is absent or blank, the input is returned
/// unchanged.
pub fn filter_by_city(results: Vec<RetrievalResult>, city: Option<&str>) -> Vec<RetrievalResult> {
    let wanted = match city.map(|c| c.trim().to_lowercase()) {
        Some(c) if !c.is_empty() => c,
        _ => return results,
    };

    let matching: Vec<RetrievalResult> = results
        .iter()
        .filter(|r| r.metadata.city.trim().to_lowercase() == wanted)
        .cloned()
        .collect();

    if matching.is_empty() {
        tracing::debug!("No results in city {:?}; keeping unfiltered results", wanted);
        results
    } else {
        matching
    }
}

/// Tag frequency across the results, most frequent first.
pub fn aggregate_vibes(results: &[RetrievalResult]) -> Vec<String> {
    let mut counter = TagCounter::default();
    for result in results {
        for tag in &result.metadata.vibes {
            counter.add(tag);
        }
    }
    counter.ranked()
}

/// `local` followed by `global`, de-duplicated in first-seen order and capped.
pub fn merge_vibes(local: &[String], global: &[String], cap: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(cap);
    for tag in local.iter().chain(global) {
        if merged.len() == cap {
            break;
        }
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// A loaded store ready for queries.
#[derive(Debug)]
pub struct Retriever {
    store: VectorStore,
    vibes: CityVibeSummary,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    /// Load the store in `dir` and check it was built with `embedder`'s
    /// identity.
    pub fn load(dir: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let store = VectorStore::load(dir)?;
        let vibes = CityVibeSummary::load(&dir.join(VIBES_FILE))?;
        Self::from_parts(store, vibes, embedder)
    }

    /// Assemble a retriever from an in-memory store.
    pub fn from_parts(
        store: VectorStore,
        vibes: CityVibeSummary,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        let current = EmbeddingConfig {
            provider: embedder.provider_name().to_string(),
            model: embedder.model_name().to_string(),
            dimensions: embedder.dimensions(),
            ..EmbeddingConfig::default()
        };
        current.validate_consistency(store.identity())?;

        Ok(Self {
            store,
            vibes,
            embedder,
        })
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn vibe_summary(&self) -> &CityVibeSummary {
        &self.vibes
    }

    /// The `top_k` nearest chunks to `query`, closest first.
    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievalResult>> {
        let vector = self.embedder.embed(query).await?;
        let results = self.store.search(&vector, top_k)?;

        tracing::debug!(
            "Retrieved {} results (best score: {:?})",
            results.len(),
            results.first().map(|r| r.score)
        );
        Ok(results)
    }

    /// Like [`search`](Self::search), preferring chunks from `city`.
    ///
    /// Over-fetches so that filtering still leaves up to `top_k` results; falls
    /// back to the unfiltered ranking when the city has no hits.
    pub async fn search_in_city(
        &self,
        query: &str,
        top_k: usize,
        city: Option<&str>,
    ) -> AppResult<Vec<RetrievalResult>> {
        let has_city = city.map(|c| !c.trim().is_empty()).unwrap_or(false);
        if !has_city {
            return self.search(query, top_k).await;
        }

        let fetched = self.search(query, top_k.saturating_mul(CITY_OVERFETCH)).await?;
        let mut filtered = filter_by_city(fetched, city);
        filtered.truncate(top_k);
        Ok(filtered)
    }

    /// Merged vibe keywords for a result set: query-local tags first, then the
    /// city's global top tags.
    pub fn vibes_for(&self, results: &[RetrievalResult], city: Option<&str>) -> Vec<String> {
        let local = aggregate_vibes(results);
        let global = city.map(|c| self.vibes.top_tags(c)).unwrap_or(&[]);
        merge_vibes(&local, global, VIBE_DISPLAY_CAP)
    }
}

/// Lazily loaded, shared [`Retriever`].
pub struct StoreHandle {
    dir: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    cell: OnceCell<Arc<Retriever>>,
}

impl StoreHandle {
    pub fn new(dir: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            dir: dir.into(),
            embedder,
            cell: OnceCell::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load on first call; later calls return the same instance.
    pub async fn get_or_load(&self) -> AppResult<Arc<Retriever>> {
        self.cell
            .get_or_try_init(|| async {
                tracing::info!("Loading store from {:?}", self.dir);
                Retriever::load(&self.dir, Arc::clone(&self.embedder)).map(Arc::new)
            })
            .await
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::types::ChunkMetadata;
    use crate::vibes::VibeAggregator;
    use tempfile::TempDir;
    use tripweave_core::AppError;

    fn result(city: &str, vibes: &[&str]) -> RetrievalResult {
        RetrievalResult {
            score: 0.0,
            chunk: format!("chunk from {}", city),
            metadata: ChunkMetadata {
                source: "s.csv".to_string(),
                city: city.to_string(),
                vibes: vibes.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        }
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_by_city_matches_case_insensitively() {
        let results = vec![result("paris", &[]), result("kyoto", &[]), result("Paris", &[])];
        let filtered = filter_by_city(results, Some("  PARIS "));
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.metadata.city.eq_ignore_ascii_case("paris")));
    }

    #[test]
    fn test_filter_by_city_falls_back_when_no_match() {
        let results = vec![result("paris", &[]), result("kyoto", &[])];
        let filtered = filter_by_city(results.clone(), Some("lisbon"));
        assert_eq!(filtered, results);
    }

    #[test]
    fn test_filter_by_city_blank_is_identity() {
        let results = vec![result("paris", &[])];
        assert_eq!(filter_by_city(results.clone(), None), results);
        assert_eq!(filter_by_city(results.clone(), Some("  ")), results);
    }

    #[test]
    fn test_aggregate_and_merge_vibes() {
        let results = vec![
            result("paris", &["美食", "夜景"]),
            result("paris", &["夜景"]),
        ];
        let local = aggregate_vibes(&results);
        assert_eq!(local, strings(&["夜景", "美食"]));

        let merged = merge_vibes(&local, &strings(&["浪漫", "美食", "艺术"]), 3);
        assert_eq!(merged, strings(&["夜景", "美食", "浪漫"]));
    }

    #[test]
    fn test_merge_vibes_cap_applies_to_unique_tags() {
        let local: Vec<String> = (0..10).map(|i| format!("t{}", i)).collect();
        assert_eq!(merge_vibes(&local, &[], VIBE_DISPLAY_CAP).len(), VIBE_DISPLAY_CAP);
    }

    async fn build_store(dir: &Path, provider: &TrigramProvider) {
        let texts = strings(&[
            "eiffel tower picnic by the seine",
            "louvre museum and montmartre cafes",
            "fushimi inari shrine gates at dawn",
        ]);
        let vectors = provider.embed_batch(&texts).await.unwrap();
        let metadata = vec![
            ChunkMetadata {
                source: "paris.csv".into(),
                city: "paris".into(),
                vibes: strings(&["浪漫"]),
                ..Default::default()
            },
            ChunkMetadata {
                source: "paris.csv".into(),
                city: "paris".into(),
                vibes: strings(&["艺术"]),
                ..Default::default()
            },
            ChunkMetadata {
                source: "kyoto.csv".into(),
                city: "kyoto".into(),
                vibes: strings(&["宁静"]),
                ..Default::default()
            },
        ];
        let store = VectorStore::build(vectors, texts, metadata, provider.identity()).unwrap();

        let mut agg = VibeAggregator::new();
        agg.add("kyoto", &strings(&["宁静", "古都"]));
        store.save(dir, &agg.summary(15)).unwrap();
    }

    #[tokio::test]
    async fn test_search_and_city_filter_end_to_end() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        let provider = TrigramProvider::new(256);
        build_store(&dir, &provider).await;

        let retriever = Retriever::load(&dir, Arc::new(TrigramProvider::new(256))).unwrap();

        let results = retriever.search("fushimi inari shrine gates at dawn", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata.city, "kyoto");
        assert!(results[0].score <= results[1].score);

        let in_paris = retriever
            .search_in_city("fushimi inari shrine", 1, Some("Paris"))
            .await
            .unwrap();
        assert_eq!(in_paris.len(), 1);
        assert_eq!(in_paris[0].metadata.city, "paris");

        let vibes = retriever.vibes_for(&results[..1], Some("kyoto"));
        assert_eq!(vibes, strings(&["宁静", "古都"]));
    }

    #[tokio::test]
    async fn test_identity_mismatch_rejected() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        build_store(&dir, &TrigramProvider::new(256)).await;

        let result = Retriever::load(&dir, Arc::new(TrigramProvider::new(128)));
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }

    #[tokio::test]
    async fn test_store_handle_loads_once() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        build_store(&dir, &TrigramProvider::new(256)).await;

        let handle = StoreHandle::new(&dir, Arc::new(TrigramProvider::new(256)));
        assert!(!handle.is_loaded());

        let first = handle.get_or_load().await.unwrap();
        let second = handle.get_or_load().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(handle.is_loaded());
    }

    #[tokio::test]
    async fn test_store_handle_missing_store() {
        let temp = TempDir::new().unwrap();
        let handle = StoreHandle::new(temp.path().join("absent"), Arc::new(TrigramProvider::new(8)));
        assert!(matches!(handle.get_or_load().await, Err(AppError::NotFound(_))));
        assert!(!handle.is_loaded());
    }
}
