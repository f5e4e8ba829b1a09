use async_trait::async_trait;

use crate::domain::{DomainError, EmbeddingConfig};

/// Maps text to a fixed-length unit-norm vector.
///
/// Implementations must be deterministic for a fixed model version. Callers
/// rely on every returned vector having exactly `config().dimensions()`
/// elements; the joint space builder rejects anything else.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    fn config(&self) -> &EmbeddingConfig;
}
