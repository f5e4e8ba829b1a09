use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::application::{ImageEmbedder, TextEmbedder};
use crate::domain::DomainError;

/// Composes text and image embeddings into the joint `2D` vector space.
///
/// Index-time vectors are the concatenation `[text_emb, image_emb]`; a chunk
/// without a readable image gets a zero image half. Query vectors populate
/// the half matching their modality and zero-pad the other, so raw L2
/// distances against stored vectors stay meaningful across all three query
/// modes.
///
/// A combined text+image query is the elementwise average of the two padded
/// single-modality vectors, i.e. `[text_emb / 2, image_emb / 2]`. Both halves
/// are damped to half magnitude relative to an index vector with both halves
/// populated. That asymmetry is part of the scheme's observed ranking
/// behavior and is kept as-is.
pub struct JointSpaceBuilder {
    text_embedder: Arc<dyn TextEmbedder>,
    image_embedder: Arc<dyn ImageEmbedder>,
    dimensions: usize,
}

impl JointSpaceBuilder {
    /// Fails when the two providers disagree on their output dimensionality;
    /// the whole index relies on a single per-modality `D`.
    pub fn new(
        text_embedder: Arc<dyn TextEmbedder>,
        image_embedder: Arc<dyn ImageEmbedder>,
    ) -> Result<Self, DomainError> {
        let dimensions = text_embedder.config().dimensions();
        if image_embedder.dimensions() != dimensions {
            return Err(DomainError::dimension_mismatch(
                dimensions,
                image_embedder.dimensions(),
            ));
        }

        Ok(Self {
            text_embedder,
            image_embedder,
            dimensions,
        })
    }

    /// Per-modality dimensionality `D`.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Size of every vector in the joint space (`2D`).
    pub fn combined_dimensions(&self) -> usize {
        self.dimensions * 2
    }

    /// Build the vector stored for one catalog chunk.
    ///
    /// Text is mandatory and always embedded. The image is optional: only a
    /// path that resolves to an existing file is embedded, anything else
    /// yields a zero image half so the chunk is still indexed. A path that
    /// exists but cannot be decoded is a real failure and propagates.
    pub async fn build_index_vector(
        &self,
        text: &str,
        image_path: Option<&Path>,
    ) -> Result<Vec<f32>, DomainError> {
        let text_emb = self.checked(self.text_embedder.embed_text(text).await?)?;

        let image_emb = match image_path {
            Some(path) if path.is_file() => {
                self.checked(self.image_embedder.embed_image(path).await?)?
            }
            Some(path) => {
                debug!("Image path missing or not a file, zero-padding: {:?}", path);
                vec![0.0; self.dimensions]
            }
            None => vec![0.0; self.dimensions],
        };

        Ok(concat(&text_emb, &image_emb))
    }

    /// `[text_emb(query), zeros(D)]`
    pub async fn build_text_query_vector(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        let text_emb = self.checked(self.text_embedder.embed_text(query).await?)?;
        Ok(concat(&text_emb, &vec![0.0; self.dimensions]))
    }

    /// `[zeros(D), image_emb(path)]`
    pub async fn build_image_query_vector(&self, path: &Path) -> Result<Vec<f32>, DomainError> {
        let image_emb = self.checked(self.image_embedder.embed_image(path).await?)?;
        Ok(concat(&vec![0.0; self.dimensions], &image_emb))
    }

    /// Elementwise average of the text-only and image-only query vectors.
    pub async fn build_combined_query_vector(
        &self,
        query: &str,
        path: &Path,
    ) -> Result<Vec<f32>, DomainError> {
        let text_vec = self.build_text_query_vector(query).await?;
        let image_vec = self.build_image_query_vector(path).await?;

        Ok(text_vec
            .iter()
            .zip(image_vec.iter())
            .map(|(t, i)| (t + i) / 2.0)
            .collect())
    }

    fn checked(&self, vector: Vec<f32>) -> Result<Vec<f32>, DomainError> {
        if vector.len() != self.dimensions {
            return Err(DomainError::dimension_mismatch(
                self.dimensions,
                vector.len(),
            ));
        }
        Ok(vector)
    }
}

fn concat(first: &[f32], second: &[f32]) -> Vec<f32> {
    let mut combined = Vec::with_capacity(first.len() + second.len());
    combined.extend_from_slice(first);
    combined.extend_from_slice(second);
    combined
}
