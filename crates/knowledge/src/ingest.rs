//! Offline ingestion: CSV corpus to a persisted vector store.

use crate::chunker::chunk_record;
use crate::corpus::{discover_csv_files, load_records};
use crate::embeddings::{embed_in_batches, EmbeddingProvider};
use crate::progress::ProgressReporter;
use crate::store::VectorStore;
use crate::types::{Chunk, ChunkMetadata, CorpusRecord, IngestOptions, IngestStats};
use crate::vibes::{VibeAggregator, VibeExtractor, SUMMARY_TOP_N};
use std::sync::Arc;
use std::time::Instant;
use tripweave_core::{AppError, AppResult};

/// Build the store at `options.store_dir` from every CSV under `options.data_dir`.
///
/// Unreadable files are logged and skipped. Without a `vibe_extractor` every
/// chunk gets an empty tag list and the city summary is empty. Nothing is
/// written unless at least one chunk was embedded, so a failed run leaves the
/// previous store in place.
pub async fn ingest(
    options: &IngestOptions,
    embedder: Arc<dyn EmbeddingProvider>,
    vibe_extractor: Option<&VibeExtractor>,
    progress: &ProgressReporter,
) -> AppResult<IngestStats> {
    let start = Instant::now();

    tracing::info!(
        "Starting ingestion from {:?} into {:?} (embedder: {})",
        options.data_dir,
        options.store_dir,
        embedder.identity()
    );

    let files = discover_csv_files(&options.data_dir)?;
    progress.discover(files.len() as u64, &options.data_dir.display().to_string());

    let mut stats = IngestStats::default();
    let mut records: Vec<CorpusRecord> = Vec::new();
    // (owning record, chunk) in store row order
    let mut pending: Vec<(usize, Chunk)> = Vec::new();

    for (i, path) in files.iter().enumerate() {
        let file = match load_records(path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        stats.files += 1;
        stats.skipped_records += file.skipped;

        for record in file.records {
            let owner = records.len();
            pending.extend(chunk_record(&record, options.max_tokens).map(|c| (owner, c)));
            records.push(record);
        }

        progress.chunk(
            i as u64 + 1,
            files.len() as u64,
            &path.display().to_string(),
            pending.len(),
        );
    }

    stats.records = records.len() as u32;
    stats.chunks = pending.len() as u32;

    if pending.is_empty() {
        return Err(AppError::Knowledge(format!(
            "No chunks produced from {:?}; store left unchanged",
            options.data_dir
        )));
    }

    let mut aggregator = VibeAggregator::new();
    let mut record_vibes: Vec<Vec<String>> = vec![Vec::new(); records.len()];
    if let Some(extractor) = vibe_extractor {
        let total = records.len() as u64;
        for (i, record) in records.iter().enumerate() {
            let tags = extractor
                .extract(&record.title, &record.body, &record.city)
                .await;
            aggregator.add(&record.city, &tags);
            record_vibes[i] = tags;
            progress.vibes(i as u64 + 1, total, &record.city);
        }
    } else {
        tracing::info!("Vibe extraction disabled; chunks get no tags");
    }
    let summary = aggregator.summary(SUMMARY_TOP_N);
    stats.cities = summary.len() as u32;

    let metadata: Vec<ChunkMetadata> = pending
        .iter()
        .map(|(owner, chunk)| ChunkMetadata::for_chunk(&records[*owner], chunk, &record_vibes[*owner]))
        .collect();
    let chunks: Vec<String> = pending.into_iter().map(|(_, chunk)| chunk.text).collect();

    let total = chunks.len() as u64;
    let model = embedder.model_name().to_string();
    let vectors = embed_in_batches(embedder.as_ref(), &chunks, options.batch_size, |done| {
        progress.embed(done as u64, total, &model)
    })
    .await?;

    let store = VectorStore::build(vectors, chunks, metadata, embedder.identity())?;
    progress.index(store.len() as u64, &options.store_dir.display().to_string());
    store.save(&options.store_dir, &summary)?;

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Ingestion completed: {} files, {} records ({} skipped), {} chunks, {} cities in {:.2}s",
        stats.files,
        stats.records,
        stats.skipped_records,
        stats.chunks,
        stats.cities,
        stats.duration_secs
    );

    Ok(stats)
}
