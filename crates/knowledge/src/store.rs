//! Exact L2 vector store and its on-disk layout.
//!
//! A store directory holds four files:
//! - `index.bin`: header (magic, version, dimension, row count, embedding
//!   identity, build time) followed by little-endian `f32` rows
//! - `metadata.json`: one [`ChunkMetadata`] per row, pretty UTF-8 JSON
//! - `chunks.json`: raw chunk texts, one per row
//! - `city_vibes.json`: the per-city vibe summary
//!
//! Row *i* of the index, entry *i* of the metadata and chunk *i* always
//! describe the same chunk. Saving writes a staging directory and swaps it
//! into place, so readers see either the old store or the new one.

use crate::types::{ChunkMetadata, RetrievalResult, StoreStats};
use crate::vibes::CityVibeSummary;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tripweave_core::{AppError, AppResult};

pub const INDEX_FILE: &str = "index.bin";
pub const METADATA_FILE: &str = "metadata.json";
pub const CHUNKS_FILE: &str = "chunks.json";
pub const VIBES_FILE: &str = "city_vibes.json";

const MAGIC: &[u8; 4] = b"TWIX";
const FORMAT_VERSION: u32 = 1;
const MAX_IDENTITY_LEN: usize = 1024;

/// Brute-force index over squared Euclidean distance.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append one row.
    pub fn add(&mut self, vector: &[f32]) -> AppResult<()> {
        if vector.len() != self.dimension {
            return Err(AppError::Knowledge(format!(
                "Vector has dimension {}, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// The `k` nearest rows as `(row, squared distance)`, closest first.
    ///
    /// Equal distances are ordered by row. A `k` above the row count returns
    /// every row.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(AppError::Knowledge(format!(
                "Query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| {
                let distance = vector
                    .iter()
                    .zip(query)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>();
                (row, distance)
            })
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Header of `index.bin`.
#[derive(Debug, Clone, PartialEq)]
struct IndexHeader {
    dimension: usize,
    count: usize,
    identity: String,
    built_at: DateTime<Utc>,
}

fn write_index(path: &Path, index: &FlatL2Index, identity: &str, built_at: DateTime<Utc>) -> AppResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&(index.dimension() as u32).to_le_bytes())?;
    writer.write_all(&(index.len() as u64).to_le_bytes())?;
    writer.write_all(&(identity.len() as u32).to_le_bytes())?;
    writer.write_all(identity.as_bytes())?;
    writer.write_all(&built_at.timestamp_millis().to_le_bytes())?;
    for value in &index.data {
        writer.write_all(&value.to_le_bytes())?;
    }

    writer.flush()?;
    Ok(())
}

fn read_array<const N: usize>(reader: &mut impl Read) -> AppResult<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_index(path: &Path) -> AppResult<(IndexHeader, FlatL2Index)> {
    let corrupt = |what: &str| AppError::Knowledge(format!("Corrupt index {:?}: {}", path, what));
    let mut reader = BufReader::new(File::open(path)?);

    if &read_array::<4>(&mut reader)? != MAGIC {
        return Err(corrupt("bad magic"));
    }
    let version = u32::from_le_bytes(read_array(&mut reader)?);
    if version != FORMAT_VERSION {
        return Err(corrupt(&format!("unsupported format version {}", version)));
    }

    let dimension = u32::from_le_bytes(read_array(&mut reader)?) as usize;
    let count = u64::from_le_bytes(read_array(&mut reader)?) as usize;
    let identity_len = u32::from_le_bytes(read_array(&mut reader)?) as usize;
    if identity_len > MAX_IDENTITY_LEN {
        return Err(corrupt(&format!("identity length {}", identity_len)));
    }
    let mut identity = vec![0u8; identity_len];
    reader.read_exact(&mut identity)?;
    let identity = String::from_utf8(identity).map_err(|_| corrupt("identity is not UTF-8"))?;
    let millis = i64::from_le_bytes(read_array(&mut reader)?);
    let built_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| corrupt("bad timestamp"))?;

    if dimension == 0 {
        return Err(corrupt("zero dimension"));
    }

    let expected_bytes = count
        .checked_mul(dimension)
        .and_then(|total| total.checked_mul(4))
        .ok_or_else(|| corrupt("row count overflow"))?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if bytes.len() != expected_bytes {
        return Err(corrupt(&format!(
            "expected {} bytes of vectors, found {}",
            expected_bytes,
            bytes.len()
        )));
    }

    let data = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok((
        IndexHeader {
            dimension,
            count,
            identity,
            built_at,
        },
        FlatL2Index { dimension, data },
    ))
}

/// Index plus the parallel chunk texts and metadata.
#[derive(Debug, Clone)]
pub struct VectorStore {
    index: FlatL2Index,
    chunks: Vec<String>,
    metadata: Vec<ChunkMetadata>,
    identity: String,
    built_at: DateTime<Utc>,
}

impl VectorStore {
    /// Build a store from parallel arrays.
    ///
    /// Fails if the arrays differ in length, if there are no vectors, or if
    /// the vectors do not share one dimension.
    pub fn build(
        vectors: Vec<Vec<f32>>,
        chunks: Vec<String>,
        metadata: Vec<ChunkMetadata>,
        identity: impl Into<String>,
    ) -> AppResult<Self> {
        if vectors.is_empty() {
            return Err(AppError::Knowledge(
                "No embeddings generated; refusing to build an empty store".to_string(),
            ));
        }

        if vectors.len() != chunks.len() || vectors.len() != metadata.len() {
            return Err(AppError::Knowledge(format!(
                "Length mismatch: {} vectors, {} chunks, {} metadata entries",
                vectors.len(),
                chunks.len(),
                metadata.len()
            )));
        }

        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(AppError::Knowledge("Embeddings have zero dimension".to_string()));
        }

        let mut index = FlatL2Index::new(dimension);
        for vector in &vectors {
            index.add(vector)?;
        }

        Ok(Self {
            index,
            chunks,
            metadata,
            identity: identity.into(),
            built_at: Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn metadata(&self) -> &[ChunkMetadata] {
        &self.metadata
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Nearest chunks to `query`, closest first, at most `top_k`.
    pub fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<RetrievalResult>> {
        let hits = self.index.search(query, top_k)?;
        Ok(hits
            .into_iter()
            .map(|(row, score)| RetrievalResult {
                score,
                chunk: self.chunks[row].clone(),
                metadata: self.metadata[row].clone(),
            })
            .collect())
    }

    /// Persist the store and `vibes` to `dir`, replacing any previous store.
    pub fn save(&self, dir: &Path, vibes: &CityVibeSummary) -> AppResult<()> {
        let (parent, name) = split_dir(dir)?;
        fs::create_dir_all(&parent)?;

        let staging = parent.join(format!(".{}.staging-{}", name, uuid::Uuid::new_v4()));
        fs::create_dir_all(&staging)?;

        if let Err(e) = self.write_files(&staging, vibes) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        swap_into_place(&staging, dir, &parent, &name)?;

        tracing::info!(
            "Saved store with {} chunks ({}) to {:?}",
            self.len(),
            self.identity,
            dir
        );
        Ok(())
    }

    fn write_files(&self, dir: &Path, vibes: &CityVibeSummary) -> AppResult<()> {
        write_index(&dir.join(INDEX_FILE), &self.index, &self.identity, self.built_at)?;
        fs::write(
            dir.join(METADATA_FILE),
            serde_json::to_string_pretty(&self.metadata)?,
        )?;
        fs::write(dir.join(CHUNKS_FILE), serde_json::to_string(&self.chunks)?)?;
        vibes.save(&dir.join(VIBES_FILE))
    }

    /// Load a store from `dir`.
    ///
    /// A missing artifact yields `AppError::NotFound` naming the file.
    pub fn load(dir: &Path) -> AppResult<Self> {
        for file in [INDEX_FILE, METADATA_FILE, CHUNKS_FILE] {
            let path = dir.join(file);
            if !path.exists() {
                return Err(AppError::NotFound(format!(
                    "{} not found in {}",
                    file,
                    dir.display()
                )));
            }
        }

        let (header, index) = read_index(&dir.join(INDEX_FILE))?;
        let metadata: Vec<ChunkMetadata> =
            serde_json::from_str(&fs::read_to_string(dir.join(METADATA_FILE))?)?;
        let chunks: Vec<String> = serde_json::from_str(&fs::read_to_string(dir.join(CHUNKS_FILE))?)?;

        if header.count != metadata.len() || header.count != chunks.len() {
            return Err(AppError::Knowledge(format!(
                "Store {:?} is inconsistent: {} vectors, {} chunks, {} metadata entries",
                dir,
                header.count,
                chunks.len(),
                metadata.len()
            )));
        }

        tracing::debug!(
            "Loaded store from {:?}: {} chunks, dimension {}, {}",
            dir,
            header.count,
            header.dimension,
            header.identity
        );

        Ok(Self {
            index,
            chunks,
            metadata,
            identity: header.identity,
            built_at: header.built_at,
        })
    }

    /// Summary statistics of this store as persisted in `dir`.
    pub fn stats(&self, dir: &Path, vibes: &CityVibeSummary) -> StoreStats {
        let mut cities: Vec<String> = self
            .metadata
            .iter()
            .filter(|m| !m.city.is_empty())
            .map(|m| m.city.clone())
            .collect();
        cities.sort();
        cities.dedup();

        let size_bytes = [INDEX_FILE, METADATA_FILE, CHUNKS_FILE, VIBES_FILE]
            .iter()
            .filter_map(|f| fs::metadata(dir.join(f)).ok())
            .map(|m| m.len())
            .sum();

        StoreStats {
            store_dir: dir.to_path_buf(),
            chunks: self.len(),
            dimensions: self.dimension(),
            identity: self.identity.clone(),
            built_at: self.built_at,
            cities,
            vibe_cities: vibes.len(),
            size_bytes,
        }
    }
}

fn split_dir(dir: &Path) -> AppResult<(PathBuf, String)> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Knowledge(format!("Invalid store directory: {:?}", dir)))?
        .to_string();
    let parent = match dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((parent, name))
}

fn swap_into_place(staging: &Path, dir: &Path, parent: &Path, name: &str) -> AppResult<()> {
    let backup = if dir.exists() {
        let backup = parent.join(format!(".{}.backup-{}", name, uuid::Uuid::new_v4()));
        fs::rename(dir, &backup)?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(staging, dir) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, dir);
        }
        let _ = fs::remove_dir_all(staging);
        return Err(AppError::Knowledge(format!(
            "Failed to move new store into {:?}: {}",
            dir, e
        )));
    }

    if let Some(backup) = backup {
        if let Err(e) = fs::remove_dir_all(&backup) {
            tracing::warn!("Failed to remove old store {:?}: {}", backup, e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vibes::VibeAggregator;
    use tempfile::TempDir;

    fn meta(source: &str, city: &str) -> ChunkMetadata {
        ChunkMetadata {
            source: source.to_string(),
            city: city.to_string(),
            ..Default::default()
        }
    }

    fn sample_store() -> VectorStore {
        VectorStore::build(
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 2.0]],
            vec!["origin".into(), "east".into(), "north".into()],
            vec![meta("a.csv", "paris"), meta("b.csv", ""), meta("c.csv", "kyoto")],
            "trigram/trigram-v1/2",
        )
        .unwrap()
    }

    #[test]
    fn test_flat_index_search_order_and_ties() {
        let mut index = FlatL2Index::new(1);
        for v in [3.0, 1.0, -1.0, 0.0] {
            index.add(&[v]).unwrap();
        }

        let hits = index.search(&[0.0], 10).unwrap();
        assert_eq!(hits.len(), 4);
        // rows 1 and 2 tie at distance 1.0; lower row first
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![3, 1, 2, 0]);
        assert_eq!(hits[0].1, 0.0);
        assert_eq!(hits[3].1, 9.0);
    }

    #[test]
    fn test_flat_index_rejects_wrong_dimension() {
        let mut index = FlatL2Index::new(2);
        assert!(index.add(&[1.0]).is_err());
        assert!(index.search(&[1.0, 2.0, 3.0], 1).is_err());
    }

    #[test]
    fn test_self_query_returns_own_row_first() {
        let store = sample_store();
        for row in 0..store.len() {
            let query = store.index.row(row).unwrap().to_vec();
            let results = store.search(&query, 1).unwrap();
            assert_eq!(results[0].chunk, store.chunks()[row]);
            assert_eq!(results[0].score, 0.0);
        }
    }

    #[test]
    fn test_build_rejects_empty_and_mismatched() {
        assert!(VectorStore::build(vec![], vec![], vec![], "x/y/1").is_err());
        assert!(VectorStore::build(
            vec![vec![1.0]],
            vec!["a".into(), "b".into()],
            vec![meta("a", "")],
            "x/y/1"
        )
        .is_err());
        assert!(VectorStore::build(
            vec![vec![1.0], vec![1.0, 2.0]],
            vec!["a".into(), "b".into()],
            vec![meta("a", ""), meta("b", "")],
            "x/y/1"
        )
        .is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        let store = sample_store();

        let mut agg = VibeAggregator::new();
        agg.add("paris", &["浪漫".to_string()]);
        store.save(&dir, &agg.summary(15)).unwrap();

        let loaded = VectorStore::load(&dir).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimension(), 2);
        assert_eq!(loaded.identity(), "trigram/trigram-v1/2");
        assert_eq!(loaded.built_at().timestamp_millis(), store.built_at().timestamp_millis());
        assert_eq!(loaded.index, store.index);
        assert_eq!(loaded.metadata(), store.metadata());
        assert!(dir.join(VIBES_FILE).exists());

        let stats = loaded.stats(&dir, &CityVibeSummary::load(&dir.join(VIBES_FILE)).unwrap());
        assert_eq!(stats.cities, vec!["kyoto".to_string(), "paris".to_string()]);
        assert_eq!(stats.vibe_cities, 1);
        assert!(stats.size_bytes > 0);
    }

    #[test]
    fn test_save_replaces_previous_store_without_leftovers() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        sample_store().save(&dir, &CityVibeSummary::default()).unwrap();

        let smaller = VectorStore::build(
            vec![vec![5.0]],
            vec!["only".into()],
            vec![meta("z.csv", "")],
            "trigram/trigram-v1/1",
        )
        .unwrap();
        smaller.save(&dir, &CityVibeSummary::default()).unwrap();

        let loaded = VectorStore::load(&dir).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.chunks(), &["only".to_string()]);

        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "staging and backup directories are removed");
    }

    #[test]
    fn test_load_names_missing_artifact() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        sample_store().save(&dir, &CityVibeSummary::default()).unwrap();
        fs::remove_file(dir.join(CHUNKS_FILE)).unwrap();

        match VectorStore::load(&dir) {
            Err(AppError::NotFound(msg)) => assert!(msg.contains(CHUNKS_FILE)),
            other => panic!("expected NotFound, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_load_rejects_inconsistent_lengths() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        sample_store().save(&dir, &CityVibeSummary::default()).unwrap();
        fs::write(dir.join(CHUNKS_FILE), r#"["just one"]"#).unwrap();

        assert!(matches!(VectorStore::load(&dir), Err(AppError::Knowledge(_))));
    }

    #[test]
    fn test_load_rejects_corrupt_index() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        sample_store().save(&dir, &CityVibeSummary::default()).unwrap();
        fs::write(dir.join(INDEX_FILE), b"NOPE").unwrap();

        assert!(VectorStore::load(&dir).is_err());
    }

    fn header_bytes(dimension: u32, count: u64, identity_len: u32, identity: &[u8]) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&dimension.to_le_bytes());
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes.extend_from_slice(&identity_len.to_le_bytes());
        bytes.extend_from_slice(identity);
        bytes.extend_from_slice(&0i64.to_le_bytes());
        bytes
    }

    #[test]
    fn test_read_index_rejects_oversized_identity() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(INDEX_FILE);
        fs::write(&path, header_bytes(2, 0, u32::MAX, b"")).unwrap();

        assert!(matches!(read_index(&path), Err(AppError::Knowledge(_))));
    }

    #[test]
    fn test_read_index_rejects_overflowing_row_count() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(INDEX_FILE);
        let identity = b"trigram/trigram-v1/1";
        fs::write(
            &path,
            header_bytes(1, u64::MAX / 2, identity.len() as u32, identity),
        )
        .unwrap();

        assert!(matches!(read_index(&path), Err(AppError::Knowledge(_))));
    }
}
