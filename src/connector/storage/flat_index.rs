use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{Chunk, DomainError, SearchResult};

const INDEX_EXT: &str = "index";
const STORE_EXT: &str = "store";

/// Flat exact-L2 index over the joint embedding space.
///
/// Vectors live in one row-major `Vec<f32>` aligned positionally with
/// `chunks`. Search is a brute-force scan — a deliberate correctness over
/// scale tradeoff for catalog-sized data, not a placeholder for an
/// approximate index. The store is immutable after build/load, so concurrent
/// searches need no locking.
pub struct IndexStore {
    dimensions: usize,
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

/// On-disk vector artifact (`<base>.index`).
#[derive(Serialize, Deserialize)]
struct IndexArtifact {
    dimensions: u32,
    vectors: Vec<f32>,
}

/// On-disk companion artifact (`<base>.store`), positionally aligned with
/// the vector artifact.
#[derive(Serialize, Deserialize)]
struct StoreArtifact {
    chunks: Vec<Chunk>,
}

impl IndexStore {
    /// Assemble a store from embedded chunks. All vectors must share one
    /// length; the first row establishes it.
    pub fn from_entries(entries: Vec<(Chunk, Vec<f32>)>) -> Result<Self, DomainError> {
        if entries.is_empty() {
            return Err(DomainError::empty_input(
                "no chunks provided to build the index",
            ));
        }

        let dimensions = entries[0].1.len();
        if dimensions == 0 {
            return Err(DomainError::dimension_mismatch(1, 0));
        }

        let mut vectors = Vec::with_capacity(entries.len() * dimensions);
        let mut chunks = Vec::with_capacity(entries.len());

        for (chunk, vector) in entries {
            if vector.len() != dimensions {
                return Err(DomainError::dimension_mismatch(dimensions, vector.len()));
            }
            vectors.extend_from_slice(&vector);
            chunks.push(chunk);
        }

        info!(
            "Built flat index with {} vectors, dimension {}",
            chunks.len(),
            dimensions
        );

        Ok(Self {
            dimensions,
            vectors,
            chunks,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dimensionality of every stored vector (`2D` in the joint space).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Up to `k` nearest rows by squared Euclidean distance, ascending.
    ///
    /// Ties keep insertion order (stable sort over a scan in insertion
    /// order), so repeated searches against an unmodified store return
    /// identical rankings.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, DomainError> {
        if k == 0 {
            return Err(DomainError::invalid_argument("k must be positive"));
        }
        if query.len() != self.dimensions {
            return Err(DomainError::dimension_mismatch(self.dimensions, query.len()));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(row, vector)| (row, squared_l2(query, vector)))
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!("Scanned {} vectors, returning {}", self.len(), scored.len());

        Ok(scored
            .into_iter()
            .map(|(row, distance)| SearchResult::new(self.chunks[row].clone(), distance))
            .collect())
    }

    /// Write both artifacts next to `base`, via temp files renamed into
    /// place so a crashed build never leaves a partial index behind.
    pub fn persist(&self, base: &Path) -> Result<(), DomainError> {
        if let Some(parent) = base.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let index = IndexArtifact {
            dimensions: self.dimensions as u32,
            vectors: self.vectors.clone(),
        };
        let store = StoreArtifact {
            chunks: self.chunks.clone(),
        };

        write_artifact(&artifact_path(base, INDEX_EXT), &index)?;
        write_artifact(&artifact_path(base, STORE_EXT), &store)?;

        info!(
            "Persisted index with {} vectors to {:?}",
            self.len(),
            artifact_path(base, INDEX_EXT)
        );
        Ok(())
    }

    /// Reconstruct a store persisted by [`IndexStore::persist`].
    ///
    /// Missing, truncated, or empty artifacts fail with `IndexCorrupt` —
    /// search over zero vectors is undefined, so an empty matrix is treated
    /// the same as a damaged one.
    pub fn load(base: &Path) -> Result<Self, DomainError> {
        let index_path = artifact_path(base, INDEX_EXT);
        let store_path = artifact_path(base, STORE_EXT);

        let index: IndexArtifact = read_artifact(&index_path)?;
        let store: StoreArtifact = read_artifact(&store_path)?;

        let dimensions = index.dimensions as usize;
        if dimensions == 0 || index.vectors.is_empty() || store.chunks.is_empty() {
            return Err(DomainError::index_corrupt(format!(
                "empty index at {:?}",
                index_path
            )));
        }
        if index.vectors.len() % dimensions != 0 {
            return Err(DomainError::index_corrupt(format!(
                "truncated vector matrix at {:?}: {} floats is not a multiple of dimension {}",
                index_path,
                index.vectors.len(),
                dimensions
            )));
        }
        let rows = index.vectors.len() / dimensions;
        if rows != store.chunks.len() {
            return Err(DomainError::index_corrupt(format!(
                "artifact mismatch at {:?}: {} vectors vs {} chunks",
                index_path,
                rows,
                store.chunks.len()
            )));
        }

        info!("Loaded index with {} vectors from {:?}", rows, index_path);

        Ok(Self {
            dimensions,
            vectors: index.vectors,
            chunks: store.chunks,
        })
    }

    /// Whether both artifacts for `base` are present on disk.
    pub fn exists(base: &Path) -> bool {
        artifact_path(base, INDEX_EXT).is_file() && artifact_path(base, STORE_EXT).is_file()
    }
}

fn artifact_path(base: &Path, ext: &str) -> PathBuf {
    base.with_extension(ext)
}

fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<(), DomainError> {
    let bytes = bincode::serialize(value)
        .map_err(|e| DomainError::storage(format!("failed to encode {:?}: {}", path, e)))?;

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn read_artifact<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DomainError> {
    let bytes = std::fs::read(path)
        .map_err(|e| DomainError::index_corrupt(format!("cannot read {:?}: {}", path, e)))?;

    bincode::deserialize(&bytes)
        .map_err(|e| DomainError::index_corrupt(format!("cannot decode {:?}: {}", path, e)))
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChunkMetadata;

    fn chunk(name: &str) -> Chunk {
        Chunk::new(
            format!("{} description", name),
            ChunkMetadata::new("B0001", name, None, "catalog.json"),
        )
    }

    fn sample_store() -> IndexStore {
        IndexStore::from_entries(vec![
            (chunk("alpha"), vec![0.0, 0.0]),
            (chunk("beta"), vec![1.0, 0.0]),
            (chunk("gamma"), vec![0.0, 2.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_build_is_rejected() {
        let result = IndexStore::from_entries(vec![]);
        assert!(matches!(result, Err(DomainError::EmptyInput(_))));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let result = IndexStore::from_entries(vec![
            (chunk("alpha"), vec![0.0, 0.0]),
            (chunk("beta"), vec![1.0, 0.0, 0.0]),
        ]);

        assert!(matches!(
            result,
            Err(DomainError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_search_orders_by_ascending_distance() {
        let store = sample_store();

        let results = store.search(&[0.0, 0.0], 3).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk().metadata().product_name(), "alpha");
        assert_eq!(results[1].chunk().metadata().product_name(), "beta");
        assert_eq!(results[2].chunk().metadata().product_name(), "gamma");
        assert!(results[0].distance() <= results[1].distance());
        assert!(results[1].distance() <= results[2].distance());
    }

    #[test]
    fn test_search_k_larger_than_store_returns_everything() {
        let store = sample_store();

        let results = store.search(&[0.0, 0.0], 100).unwrap();

        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_search_rejects_zero_k() {
        let store = sample_store();

        let result = store.search(&[0.0, 0.0], 0);

        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn test_search_rejects_wrong_query_length() {
        let store = sample_store();

        let result = store.search(&[0.0, 0.0, 0.0], 1);

        assert!(matches!(
            result,
            Err(DomainError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_search_is_deterministic() {
        let store = sample_store();

        let first = store.search(&[0.5, 0.5], 3).unwrap();
        let second = store.search(&[0.5, 0.5], 3).unwrap();

        let ids: Vec<&str> = first.iter().map(|r| r.chunk().id()).collect();
        let again: Vec<&str> = second.iter().map(|r| r.chunk().id()).collect();
        assert_eq!(ids, again);
    }

    #[test]
    fn test_distance_ties_keep_insertion_order() {
        let store = IndexStore::from_entries(vec![
            (chunk("first"), vec![1.0, 0.0]),
            (chunk("second"), vec![-1.0, 0.0]),
        ])
        .unwrap();

        // Both rows are at distance 1 from the origin.
        let results = store.search(&[0.0, 0.0], 2).unwrap();

        assert_eq!(results[0].chunk().metadata().product_name(), "first");
        assert_eq!(results[1].chunk().metadata().product_name(), "second");
    }

    #[test]
    fn test_persist_load_round_trip_preserves_results() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("catalog");
        let store = sample_store();
        store.persist(&base).unwrap();

        let loaded = IndexStore::load(&base).unwrap();

        assert_eq!(loaded.len(), store.len());
        assert_eq!(loaded.dimensions(), store.dimensions());

        let query = [0.3, 0.7];
        let before = store.search(&query, 3).unwrap();
        let after = loaded.search(&query, 3).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.chunk().id(), b.chunk().id());
            assert!((a.distance() - b.distance()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_missing_index_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();

        let result = IndexStore::load(&dir.path().join("absent"));

        assert!(matches!(result, Err(DomainError::IndexCorrupt(_))));
    }

    #[test]
    fn test_load_truncated_artifact_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("catalog");
        sample_store().persist(&base).unwrap();

        let index_path = base.with_extension("index");
        let bytes = std::fs::read(&index_path).unwrap();
        std::fs::write(&index_path, &bytes[..bytes.len() / 2]).unwrap();

        let result = IndexStore::load(&base);

        assert!(matches!(result, Err(DomainError::IndexCorrupt(_))));
    }

    #[test]
    fn test_exists_reports_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("catalog");
        assert!(!IndexStore::exists(&base));

        sample_store().persist(&base).unwrap();
        assert!(IndexStore::exists(&base));

        std::fs::remove_file(base.with_extension("store")).unwrap();
        assert!(!IndexStore::exists(&base));
    }
}
