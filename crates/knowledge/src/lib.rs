//! Travel knowledge base and itinerary planning.
//!
//! Offline, [`ingest`] turns CSV travel narratives into a persisted vector
//! store with per-city vibe tags. Online, a [`Retriever`] answers
//! nearest-neighbour queries, a [`Synthesizer`] asks an LLM for a grounded
//! multi-day plan and [`parse_itinerary`] splits the reply into day blocks
//! and time slots.

pub mod chunker;
pub mod corpus;
pub mod embeddings;
pub mod ingest;
pub mod itinerary;
pub mod progress;
pub mod retriever;
pub mod store;
pub mod synthesizer;
pub mod types;
pub mod vibes;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use ingest::ingest;
pub use itinerary::{parse_itinerary, DayBlock, FavoriteCandidate, Itinerary, TimeOfDay, TimeSlot};
pub use progress::{ProgressEvent, ProgressReporter};
pub use retriever::{Retriever, StoreHandle};
pub use store::VectorStore;
pub use synthesizer::{Answer, Synthesizer};
pub use types::{ChunkMetadata, IngestOptions, IngestStats, RetrievalResult, StoreStats};
pub use vibes::{CityVibeSummary, VibeExtractor};

use std::path::Path;
use tripweave_core::AppResult;

/// Statistics for the store in `store_dir`.
///
/// Does not need an embedder: the identity is read from the index header.
pub fn store_stats(store_dir: &Path) -> AppResult<StoreStats> {
    let store = VectorStore::load(store_dir)?;
    let vibes = CityVibeSummary::load(&store_dir.join(store::VIBES_FILE))?;
    Ok(store.stats(store_dir, &vibes))
}
