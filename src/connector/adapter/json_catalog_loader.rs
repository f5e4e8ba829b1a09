use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::application::CatalogSource;
use crate::domain::{Chunk, ChunkMetadata, DomainError};

const DEFAULT_CHUNK_SIZE: usize = 300;
const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Loads product records from a folder of JSON files and splits them into
/// overlapping text chunks, attaching per-product metadata (including the
/// product image path) to every chunk.
///
/// A file may hold one product object or an array of them; non-object array
/// entries are skipped.
pub struct JsonCatalogLoader {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl JsonCatalogLoader {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    pub fn with_chunking(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    fn load_file(&self, path: &Path, chunks: &mut Vec<Chunk>) -> Result<(), DomainError> {
        debug!("Reading catalog file: {:?}", path);
        let raw = std::fs::read_to_string(path)?;
        let root: Value = serde_json::from_str(&raw)
            .map_err(|e| DomainError::invalid_argument(format!("bad JSON in {:?}: {}", path, e)))?;

        let products: Vec<&Value> = match &root {
            Value::Object(_) => vec![&root],
            Value::Array(items) => {
                let objects: Vec<&Value> = items.iter().filter(|v| v.is_object()).collect();
                if objects.len() != items.len() {
                    warn!("Skipping non-object entries in {:?}", path);
                }
                objects
            }
            _ => {
                warn!("Unsupported JSON root in {:?}, skipping file", path);
                return Ok(());
            }
        };

        for product in products {
            let text = render_product_text(product);
            let metadata = ChunkMetadata::new(
                str_field(product, "asin"),
                product
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown"),
                product
                    .get("image_url")
                    .and_then(Value::as_str)
                    .map(String::from),
                path.to_string_lossy(),
            );

            for piece in split_text(&text, self.chunk_size, self.chunk_overlap) {
                chunks.push(Chunk::new(piece, metadata.clone()));
            }
        }

        Ok(())
    }
}

impl Default for JsonCatalogLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogSource for JsonCatalogLoader {
    fn load(&self, dir: &Path) -> Result<Vec<Chunk>, DomainError> {
        if !dir.is_dir() {
            return Err(DomainError::invalid_argument(format!(
                "catalog directory not found: {:?}",
                dir
            )));
        }

        let mut chunks = Vec::new();
        let mut files: Vec<_> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "json")
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();

        for file in &files {
            self.load_file(file, &mut chunks)?;
        }

        info!("Loaded {} chunks from {} catalog files", chunks.len(), files.len());
        Ok(chunks)
    }
}

/// Render one product record as the fixed text block that gets embedded.
fn render_product_text(product: &Value) -> String {
    let support = product.get("support_data").cloned().unwrap_or(Value::Null);

    format!(
        "Product: {} ({})\nCategory: {}\nDescription: {}\nCommon Issues: {}\nTroubleshooting: {}\nWarranty: {}\nSpecifications: {}\n",
        product
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown"),
        str_field(product, "asin"),
        product
            .get("category")
            .and_then(Value::as_str)
            .unwrap_or("Unknown"),
        str_field(product, "description"),
        join_list(support.get("common_issues")),
        join_list(support.get("troubleshooting_steps")),
        support
            .get("warranty")
            .and_then(Value::as_str)
            .unwrap_or(""),
        stringify_specifications(support.get("specifications")),
    )
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn join_list(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

/// Specifications may be a map; render as comma-joined `key: value` pairs.
fn stringify_specifications(value: Option<&Value>) -> String {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}: {}", k, s),
                other => format!("{}: {}", k, other),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::String(s)) => s.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => String::new(),
    }
}

/// Split text into windows of at most `size` characters with `overlap`
/// characters carried between consecutive windows, cutting at whitespace
/// when one falls inside the window tail.
fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        let trimmed = text.trim();
        return if trimmed.is_empty() {
            vec![]
        } else {
            vec![trimmed.to_string()]
        };
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let hard_end = (start + size).min(chars.len());
        let mut end = hard_end;

        if hard_end < chars.len() {
            // Prefer a whitespace break inside the last fifth of the window.
            let floor = start + size - size / 5;
            if let Some(cut) = (floor..hard_end).rev().find(|&i| chars[i].is_whitespace()) {
                end = cut;
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed.to_string());
        }

        if end >= chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_JSON: &str = r#"{
        "asin": "B0GARMIN1",
        "name": "Garmin Forerunner",
        "category": "Smartwatch",
        "description": "GPS running watch with heart-rate tracking.",
        "image_url": "Dataset/images/garmin.jpg",
        "support_data": {
            "common_issues": ["screen flicker", "GPS drift"],
            "troubleshooting_steps": ["restart the watch", "update firmware"],
            "warranty": "1 year",
            "specifications": {"battery": "7 days", "water": "5 ATM"}
        }
    }"#;

    #[test]
    fn test_render_product_text_includes_all_sections() {
        let product: Value = serde_json::from_str(PRODUCT_JSON).unwrap();

        let text = render_product_text(&product);

        assert!(text.contains("Product: Garmin Forerunner (B0GARMIN1)"));
        assert!(text.contains("Common Issues: screen flicker, GPS drift"));
        assert!(text.contains("Warranty: 1 year"));
        assert!(text.contains("battery: 7 days"));
    }

    #[test]
    fn test_split_text_respects_size_and_overlap() {
        let text = "word ".repeat(200);

        let pieces = split_text(&text, 300, 50);

        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.chars().count() <= 300);
        }
        // Overlap: the start of each later piece re-appears near the end of
        // the previous one.
        for pair in pieces.windows(2) {
            let head: String = pair[1].chars().take(4).collect();
            assert!(pair[0].contains(&head));
        }
    }

    #[test]
    fn test_split_short_text_is_single_chunk() {
        let pieces = split_text("short text", 300, 50);
        assert_eq!(pieces, vec!["short text".to_string()]);
    }

    #[test]
    fn test_loader_attaches_metadata_to_every_chunk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("watches.json"), PRODUCT_JSON).unwrap();

        let loader = JsonCatalogLoader::new();
        let chunks = loader.load(dir.path()).unwrap();

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert_eq!(chunk.metadata().asin(), "B0GARMIN1");
            assert_eq!(chunk.metadata().image_path(), Some("Dataset/images/garmin.jpg"));
            assert!(chunk.metadata().source_file().ends_with("watches.json"));
        }
    }

    #[test]
    fn test_loader_accepts_array_roots_and_skips_non_objects() {
        let dir = tempfile::tempdir().unwrap();
        let array = format!("[{}, 42, {}]", PRODUCT_JSON, PRODUCT_JSON);
        std::fs::write(dir.path().join("catalog.json"), array).unwrap();

        let loader = JsonCatalogLoader::new();
        let chunks = loader.load(dir.path()).unwrap();

        // Two products survive, the bare number does not.
        let per_product = chunks.len();
        assert!(per_product >= 2);
        assert!(per_product % 2 == 0);
    }

    #[test]
    fn test_loader_rejects_missing_directory() {
        let loader = JsonCatalogLoader::new();
        let result = loader.load(Path::new("/no/such/catalog"));
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn test_product_without_image_yields_imageless_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let product = r#"{"asin": "B01", "name": "Citizen watch", "description": "Quartz."}"#;
        std::fs::write(dir.path().join("citizen.json"), product).unwrap();

        let loader = JsonCatalogLoader::new();
        let chunks = loader.load(dir.path()).unwrap();

        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| !c.metadata().has_image()));
    }
}
