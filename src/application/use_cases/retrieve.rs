use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::application::JointSpaceBuilder;
use crate::connector::IndexStore;
use crate::domain::{DomainError, SearchResult};

/// Thin dispatch layer over the joint space builder and the index store:
/// converts a query in any of the three modes into a space-compatible vector
/// and runs the nearest-neighbor scan.
///
/// All three entry points are pure functions of their inputs plus the store
/// content; the only shared state is the loaded embedding models.
pub struct RetrieveUseCase {
    store: Arc<IndexStore>,
    joint_space: Arc<JointSpaceBuilder>,
}

impl RetrieveUseCase {
    pub fn new(store: Arc<IndexStore>, joint_space: Arc<JointSpaceBuilder>) -> Self {
        Self { store, joint_space }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub async fn by_text(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, DomainError> {
        let start_time = Instant::now();
        let vector = self.joint_space.build_text_query_vector(query).await?;
        let results = self.store.search(&vector, k)?;

        info!(
            "Text query returned {} results in {:.2}s",
            results.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(results)
    }

    pub async fn by_image(&self, image: &Path, k: usize) -> Result<Vec<SearchResult>, DomainError> {
        let start_time = Instant::now();
        let vector = self.joint_space.build_image_query_vector(image).await?;
        let results = self.store.search(&vector, k)?;

        info!(
            "Image query returned {} results in {:.2}s",
            results.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(results)
    }

    pub async fn by_text_and_image(
        &self,
        query: &str,
        image: &Path,
        k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let start_time = Instant::now();
        let vector = self
            .joint_space
            .build_combined_query_vector(query, image)
            .await?;
        let results = self.store.search(&vector, k)?;

        info!(
            "Combined query returned {} results in {:.2}s",
            results.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(results)
    }
}
