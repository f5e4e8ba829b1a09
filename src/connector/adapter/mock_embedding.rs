use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use async_trait::async_trait;
use rand::Rng;
use rand::SeedableRng;
use tracing::debug;

use crate::application::{ImageEmbedder, TextEmbedder};
use crate::domain::{normalize, DomainError, EmbeddingConfig};

const DEFAULT_DIMENSIONS: usize = 512;

fn generate_embedding(seed_input: &str, dimensions: usize) -> Vec<f32> {
    let mut hasher = DefaultHasher::new();
    seed_input.hash(&mut hasher);
    let seed = hasher.finish();

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut vector: Vec<f32> = (0..dimensions).map(|_| rng.gen_range(-1.0..1.0)).collect();

    normalize(&mut vector);
    vector
}

/// Deterministic text embedder: hash-seeded unit-norm vectors. Used by tests
/// and `--mock-embeddings` runs where loading CLIP is unwanted.
pub struct MockTextEmbedder {
    config: EmbeddingConfig,
}

impl MockTextEmbedder {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            config: EmbeddingConfig::new("mock-text-embedding".to_string(), dimensions, 77),
        }
    }
}

impl Default for MockTextEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextEmbedder for MockTextEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let vector = generate_embedding(text, self.config.dimensions());
        debug!("Generated mock text embedding with {} dimensions", vector.len());
        Ok(vector)
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

/// Deterministic image embedder seeded on the path string.
///
/// Mirrors the real adapter's failure contract: a path that does not resolve
/// to a file is an embedding error, so query-side behavior matches CLIP even
/// though no bytes are decoded.
pub struct MockImageEmbedder {
    dimensions: usize,
}

impl MockImageEmbedder {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockImageEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageEmbedder for MockImageEmbedder {
    async fn embed_image(&self, path: &Path) -> Result<Vec<f32>, DomainError> {
        if !path.is_file() {
            return Err(DomainError::embedding(format!(
                "image not readable: {:?}",
                path
            )));
        }

        let vector = generate_embedding(&path.to_string_lossy(), self.dimensions);
        debug!("Generated mock image embedding for {:?}", path);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_text_embedding_consistency() {
        let embedder = MockTextEmbedder::new();

        let first = embedder.embed_text("hello world").await.unwrap();
        let second = embedder.embed_text("hello world").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_mock_text_embedding_dimensions() {
        let embedder = MockTextEmbedder::with_dimensions(128);

        let embedding = embedder.embed_text("test").await.unwrap();

        assert_eq!(embedding.len(), 128);
    }

    #[tokio::test]
    async fn test_mock_text_embedding_normalized() {
        let embedder = MockTextEmbedder::new();

        let embedding = embedder.embed_text("test").await.unwrap();
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

        assert!((magnitude - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_mock_image_embedding_requires_existing_file() {
        let embedder = MockImageEmbedder::new();

        let result = embedder.embed_image(Path::new("/no/such/image.jpg")).await;

        assert!(matches!(result, Err(DomainError::EmbeddingError(_))));
    }

    #[tokio::test]
    async fn test_mock_image_embedding_is_path_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.jpg");
        std::fs::write(&path, b"bytes").unwrap();

        let embedder = MockImageEmbedder::new();
        let first = embedder.embed_image(&path).await.unwrap();
        let second = embedder.embed_image(&path).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 512);
    }
}
