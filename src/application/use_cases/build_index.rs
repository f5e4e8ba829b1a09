use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::application::{CatalogSource, JointSpaceBuilder};
use crate::connector::IndexStore;
use crate::domain::DomainError;

/// Builds the joint-space index from a product catalog directory.
///
/// The build aborts on the first embedding or dimension failure and persists
/// nothing in that case — a partial index would rank inconsistently
/// downstream.
pub struct BuildIndexUseCase {
    catalog_source: Arc<dyn CatalogSource>,
    joint_space: Arc<JointSpaceBuilder>,
}

impl BuildIndexUseCase {
    pub fn new(catalog_source: Arc<dyn CatalogSource>, joint_space: Arc<JointSpaceBuilder>) -> Self {
        Self {
            catalog_source,
            joint_space,
        }
    }

    /// Load chunks, embed every one into the combined space, build the flat
    /// index, and persist it at `base`.
    pub async fn execute(&self, catalog_dir: &Path, base: &Path) -> Result<IndexStore, DomainError> {
        let chunks = self.catalog_source.load(catalog_dir)?;
        if chunks.is_empty() {
            return Err(DomainError::empty_input(format!(
                "no catalog chunks found under {:?}",
                catalog_dir
            )));
        }

        info!("Embedding {} chunks from {:?}", chunks.len(), catalog_dir);
        let start_time = Instant::now();

        let progress = ProgressBar::new(chunks.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let image_path = chunk.metadata().image_path().map(PathBuf::from);
            let vector = self
                .joint_space
                .build_index_vector(chunk.text(), image_path.as_deref())
                .await?;
            entries.push((chunk, vector));
            progress.inc(1);
        }
        progress.finish_and_clear();

        let store = IndexStore::from_entries(entries)?;
        store.persist(base)?;

        info!(
            "Indexed {} chunks in {:.2}s",
            store.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(store)
    }

    /// Startup policy: build if absent, else load.
    ///
    /// The check-then-build sequence is guarded by an exclusive lock file so
    /// two processes pointed at the same base path cannot race the build.
    pub async fn ensure(&self, catalog_dir: &Path, base: &Path) -> Result<IndexStore, DomainError> {
        if IndexStore::exists(base) {
            info!("Index already exists at {:?}, loading", base);
            return IndexStore::load(base);
        }

        let _lock = BuildLock::acquire(base)?;

        // Another process may have finished the build while we waited for
        // the lock check above.
        if IndexStore::exists(base) {
            return IndexStore::load(base);
        }

        info!("No index found at {:?}, building", base);
        self.execute(catalog_dir, base).await
    }
}

/// Exclusive lock file for index builds, removed on drop.
struct BuildLock {
    path: PathBuf,
}

impl BuildLock {
    fn acquire(base: &Path) -> Result<Self, DomainError> {
        let path = base.with_extension("lock");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(DomainError::storage(format!(
                    "index build already in progress (lock file {:?} exists)",
                    path
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove build lock {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_lock_is_exclusive_and_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("catalog");

        let lock = BuildLock::acquire(&base).unwrap();
        let second = BuildLock::acquire(&base);
        assert!(matches!(second, Err(DomainError::StorageError(_))));

        drop(lock);
        assert!(BuildLock::acquire(&base).is_ok());
    }
}
