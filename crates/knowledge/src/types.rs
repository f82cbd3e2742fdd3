//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One row of a corpus CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Path of the CSV file the row came from
    pub source: String,

    /// Zero-based data row within the file
    pub row: usize,

    pub title: String,

    /// Narrative text; never empty
    pub body: String,

    pub url: String,

    /// Lowercased city inferred from the file name, or empty
    pub city: String,
}

/// A bounded window of a record's body.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Ordinal position within the owning record
    pub position: u32,

    /// Owning source identifier
    pub source: String,

    pub text: String,
}

/// Per-chunk metadata, parallel-indexed with the vector rows.
///
/// Optional fields default to empty so older or hand-edited `metadata.json`
/// files still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,

    #[serde(default)]
    pub row: usize,

    /// Chunk text, duplicated for readers of `metadata.json` alone
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: String,

    /// Lowercased city or empty
    #[serde(default)]
    pub city: String,

    /// Vibe tags of the owning record
    #[serde(default)]
    pub vibes: Vec<String>,
}

impl ChunkMetadata {
    /// Build the metadata entry for `chunk` of `record`.
    pub fn for_chunk(record: &CorpusRecord, chunk: &Chunk, vibes: &[String]) -> Self {
        Self {
            source: record.source.clone(),
            row: record.row,
            content: chunk.text.clone(),
            title: record.title.clone(),
            url: record.url.clone(),
            city: record.city.clone(),
            vibes: vibes.to_vec(),
        }
    }

    /// Title to show for this chunk, falling back to its source.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.source
        } else {
            &self.title
        }
    }
}

/// A single nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Squared L2 distance; lower is closer
    pub score: f32,

    /// Raw chunk text
    pub chunk: String,

    pub metadata: ChunkMetadata,
}

/// Options for the ingest operation.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Directory scanned recursively for `*.csv`
    pub data_dir: PathBuf,

    /// Destination store directory; replaced wholesale
    pub store_dir: PathBuf,

    /// Maximum whitespace tokens per chunk
    pub max_tokens: usize,

    /// Texts sent to the embedder per request
    pub batch_size: usize,
}

impl IngestOptions {
    pub fn new(data_dir: impl Into<PathBuf>, store_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            store_dir: store_dir.into(),
            max_tokens: crate::chunker::DEFAULT_MAX_TOKENS,
            batch_size: 32,
        }
    }
}

/// Statistics from an ingest operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// CSV files read successfully
    pub files: u32,

    /// Records kept (non-empty body)
    pub records: u32,

    /// Rows dropped for an empty body
    pub skipped_records: u32,

    pub chunks: u32,

    /// Cities with at least one vibe tag
    pub cities: u32,

    pub duration_secs: f64,
}

/// Statistics for a persisted store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub store_dir: PathBuf,

    pub chunks: usize,

    pub dimensions: usize,

    /// Embedding identity the store was built with
    pub identity: String,

    pub built_at: DateTime<Utc>,

    /// Distinct non-empty cities across chunk metadata, sorted
    pub cities: Vec<String>,

    /// Cities present in the vibe summary
    pub vibe_cities: usize,

    /// Total size of the store files in bytes
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults_missing_fields() {
        let meta: ChunkMetadata =
            serde_json::from_str(r#"{"source": "data/reddit/paris.csv"}"#).unwrap();
        assert_eq!(meta.source, "data/reddit/paris.csv");
        assert!(meta.vibes.is_empty());
        assert_eq!(meta.city, "");
        assert_eq!(meta.display_title(), "data/reddit/paris.csv");
    }

    #[test]
    fn test_metadata_serializes_non_ascii_verbatim() {
        let meta = ChunkMetadata {
            source: "s.csv".to_string(),
            title: "成都三日游".to_string(),
            vibes: vec!["美食".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("成都三日游"));
        assert!(json.contains("美食"));
    }
}
