use std::path::Path;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Maps an image file to a fixed-length unit-norm vector.
///
/// Fails with an embedding error when the path does not resolve or the bytes
/// cannot be decoded; existence checks for optional catalog images happen in
/// the joint space builder, not here.
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    async fn embed_image(&self, path: &Path) -> Result<Vec<f32>, DomainError>;

    fn dimensions(&self) -> usize;
}
