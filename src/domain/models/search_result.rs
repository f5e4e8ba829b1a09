use serde::{Deserialize, Serialize};

use super::Chunk;

/// One ranked hit from the index store.
///
/// `distance` is squared Euclidean distance in the joint embedding space;
/// smaller is closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    chunk: Chunk,
    distance: f32,
}

impl SearchResult {
    pub fn new(chunk: Chunk, distance: f32) -> Self {
        Self { chunk, distance }
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn display_line(&self) -> String {
        format!(
            "{} (ASIN: {}, distance: {:.4})",
            self.chunk.metadata().product_name(),
            self.chunk.metadata().asin(),
            self.distance
        )
    }
}
