use std::path::Path;

use crate::domain::{Chunk, DomainError};

/// Produces indexable chunks from a catalog location.
pub trait CatalogSource: Send + Sync {
    fn load(&self, dir: &Path) -> Result<Vec<Chunk>, DomainError>;
}
