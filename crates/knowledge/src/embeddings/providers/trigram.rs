//! Trigram embedding provider for offline operation.

use crate::embeddings::provider::EmbeddingProvider;
use std::collections::{HashMap, HashSet};
use tripweave_core::AppResult;
use unicode_segmentation::UnicodeSegmentation;

/// Deterministic hashing embedder.
///
/// Hashes character trigrams and whole words into a fixed number of buckets
/// and L2-normalises the result. Not semantic, but content-dependent and
/// stable, which is enough for tests and offline development.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "we", "our", "my", "的", "了", "和", "是", "在",
];

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, token: &str, seed: u64) -> usize {
        let hash = token
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(seed).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn generate_trigram_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        let lower = text.to_lowercase();
        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower.unicode_words() {
            if !stop_words.contains(word) {
                *word_freq.entry(word).or_insert(0) += 1;
            }
        }

        for (word, freq) in &word_freq {
            embedding[self.bucket(word, 31)] += *freq as f32;
        }

        // Trigrams over the whole text so unsegmented scripts still share features
        let chars: Vec<char> = lower.chars().filter(|c| !c.is_whitespace()).collect();
        for window in chars.windows(3) {
            let trigram: String = window.iter().collect();
            embedding[self.bucket(&trigram, 37)] += 0.5;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| self.generate_trigram_embedding(text))
            .collect())
    }
}
