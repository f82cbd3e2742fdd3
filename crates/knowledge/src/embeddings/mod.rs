//! Embedding backends.
//!
//! Every store is pinned to the identity (`provider/model/dimensions`) of
//! the embedder that built it; queries must use the same identity.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::{parse_identity, EmbeddingConfig};
pub use provider::{create_provider, EmbeddingProvider};

use tripweave_core::AppResult;

/// Embed `texts` in batches of `batch_size`, preserving order.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
    mut on_batch: impl FnMut(usize),
) -> AppResult<Vec<Vec<f32>>> {
    let mut embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = provider.embed_batch(batch).await?;
        if vectors.len() != batch.len() {
            return Err(tripweave_core::AppError::Knowledge(format!(
                "Embedder returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            )));
        }
        embeddings.extend(vectors);
        on_batch(embeddings.len());
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {} with {}",
        embeddings.len(),
        provider.dimensions(),
        provider.identity()
    );

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;

    #[tokio::test]
    async fn test_embed_in_batches_preserves_order() {
        let provider = TrigramProvider::new(32);
        let texts: Vec<String> = (0..5).map(|i| format!("text number {}", i)).collect();

        let mut progress = Vec::new();
        let batched = embed_in_batches(&provider, &texts, 2, |done| progress.push(done))
            .await
            .unwrap();
        let whole = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(batched, whole);
        assert_eq!(progress, vec![2, 4, 5]);
    }
}
