use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One retrievable unit of product text plus its catalog metadata.
///
/// Chunks are created during ingestion and never mutated afterwards; the
/// index store owns them for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    id: String,
    text: String,
    metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: String, metadata: ChunkMetadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &ChunkMetadata {
        &self.metadata
    }

    /// Single-line preview of the chunk text, capped at `width` characters.
    pub fn snippet(&self, width: usize) -> String {
        let flat = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= width {
            flat
        } else {
            let cut: String = flat.chars().take(width.saturating_sub(1)).collect();
            format!("{}…", cut.trim_end())
        }
    }
}

/// Product metadata attached to every chunk derived from that product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    asin: String,
    product_name: String,
    image_path: Option<String>,
    source_file: String,
}

impl ChunkMetadata {
    pub fn new(
        asin: impl Into<String>,
        product_name: impl Into<String>,
        image_path: Option<String>,
        source_file: impl Into<String>,
    ) -> Self {
        // Ingestion feeds through empty strings when a product has no image.
        let image_path = image_path.filter(|p| !p.is_empty());
        Self {
            asin: asin.into(),
            product_name: product_name.into(),
            image_path,
            source_file: source_file.into(),
        }
    }

    pub fn asin(&self) -> &str {
        &self.asin
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref()
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn has_image(&self) -> bool {
        self.image_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_image_path_is_normalized_to_none() {
        let meta = ChunkMetadata::new("B0001", "Garmin watch", Some(String::new()), "watches.json");
        assert!(!meta.has_image());
        assert_eq!(meta.image_path(), None);
    }

    #[test]
    fn test_snippet_flattens_and_truncates() {
        let meta = ChunkMetadata::new("B0001", "Garmin watch", None, "watches.json");
        let chunk = Chunk::new("line one\nline two\nline three".to_string(), meta);

        let snippet = chunk.snippet(15);
        assert!(!snippet.contains('\n'));
        assert!(snippet.chars().count() <= 15);
        assert!(snippet.ends_with('…'));
    }
}
