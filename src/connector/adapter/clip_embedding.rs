use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::application::{ImageEmbedder, TextEmbedder};
use crate::domain::{normalize, DomainError, EmbeddingConfig};

const DEFAULT_TEXT_MODEL_ID: &str = "Qdrant/clip-ViT-B-32-text";
const DEFAULT_VISION_MODEL_ID: &str = "Qdrant/clip-ViT-B-32-vision";
const DEFAULT_DIMENSIONS: usize = 512;
const DEFAULT_MAX_SEQ_LENGTH: usize = 77;

const INPUT_SIZE: u32 = 224;
// CLIP preprocessing constants (per-channel mean/std over [0,1] RGB).
const IMAGE_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const IMAGE_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// CLIP ViT-B/32 text and visual encoders over ONNX Runtime.
///
/// Both encoders project into the same 512-dimensional space, which is what
/// makes the concatenated joint index meaningful. Sessions are created once
/// and serialized behind mutexes; ORT sessions are not assumed safe for
/// concurrent `run` calls.
pub struct ClipEmbedding {
    text_session: Arc<Mutex<Session>>,
    vision_session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    config: EmbeddingConfig,
}

impl ClipEmbedding {
    /// Download the text and vision encoders from the HuggingFace hub and
    /// load them. Heavy: call once at process start and share via `Arc`.
    pub fn new() -> Result<Self, DomainError> {
        info!(
            "Initializing CLIP embedding service ({} / {})",
            DEFAULT_TEXT_MODEL_ID, DEFAULT_VISION_MODEL_ID
        );

        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_progress(true)
            .build()
            .map_err(|e| DomainError::internal(format!("Failed to create HF API: {}", e)))?;

        let text_repo = api.model(DEFAULT_TEXT_MODEL_ID.to_string());
        let vision_repo = api.model(DEFAULT_VISION_MODEL_ID.to_string());

        let tokenizer_path = text_repo
            .get("tokenizer.json")
            .map_err(|e| DomainError::internal(format!("Failed to download tokenizer: {}", e)))?;

        let text_model_path = text_repo
            .get("model.onnx")
            .map_err(|e| DomainError::internal(format!("Failed to download text model: {}", e)))?;

        let vision_model_path = vision_repo
            .get("model.onnx")
            .map_err(|e| DomainError::internal(format!("Failed to download vision model: {}", e)))?;

        Self::from_paths(text_model_path, vision_model_path, tokenizer_path)
    }

    pub fn from_paths(
        text_model_path: PathBuf,
        vision_model_path: PathBuf,
        tokenizer_path: PathBuf,
    ) -> Result<Self, DomainError> {
        info!("Loading CLIP ONNX models from {:?}", text_model_path.parent());

        let text_session = build_session(&text_model_path)?;
        let vision_session = build_session(&vision_model_path)?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| DomainError::internal(format!("Failed to load tokenizer: {}", e)))?;

        let config = EmbeddingConfig::new(
            "clip-vit-base-patch32".to_string(),
            DEFAULT_DIMENSIONS,
            DEFAULT_MAX_SEQ_LENGTH,
        );

        Ok(Self {
            text_session: Arc::new(Mutex::new(text_session)),
            vision_session: Arc::new(Mutex::new(vision_session)),
            tokenizer: Arc::new(tokenizer),
            config,
        })
    }

    fn encode_text(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| DomainError::embedding(format!("Tokenization failed: {}", e)))?;

        let len = encoding.get_ids().len().min(self.config.max_sequence_length());
        let input_ids: Vec<i64> = encoding.get_ids()[..len].iter().map(|&x| x as i64).collect();
        let attention_mask: Vec<i64> = encoding.get_attention_mask()[..len]
            .iter()
            .map(|&x| x as i64)
            .collect();

        let shape = [1usize, len];
        let input_ids_tensor = Tensor::from_array((shape, input_ids))
            .map_err(|e| DomainError::embedding(format!("Failed to create input_ids tensor: {}", e)))?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask)).map_err(|e| {
            DomainError::embedding(format!("Failed to create attention_mask tensor: {}", e))
        })?;

        let mut session = self
            .text_session
            .lock()
            .map_err(|e| DomainError::internal(format!("Failed to lock text session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
            ])
            .map_err(|e| DomainError::embedding(format!("Text inference failed: {}", e)))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| DomainError::embedding("No output tensor found"))?;
        let (shape, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| DomainError::embedding(format!("Failed to extract output tensor: {}", e)))?;
        let shape: Vec<usize> = shape.iter().map(|&x| x as usize).collect();

        single_row(&shape, data, self.config.dimensions())
    }

    fn encode_image(&self, path: &Path) -> Result<Vec<f32>, DomainError> {
        let img = image::open(path)
            .map_err(|e| DomainError::embedding(format!("Cannot decode image {:?}: {}", path, e)))?;

        let resized = img
            .resize_exact(
                INPUT_SIZE,
                INPUT_SIZE,
                image::imageops::FilterType::CatmullRom,
            )
            .to_rgb8();

        // CHW layout, normalized per channel.
        let hw = (INPUT_SIZE * INPUT_SIZE) as usize;
        let mut pixels = vec![0.0f32; 3 * hw];
        for (idx, pixel) in resized.pixels().enumerate() {
            for channel in 0..3 {
                let value = pixel.0[channel] as f32 / 255.0;
                pixels[channel * hw + idx] = (value - IMAGE_MEAN[channel]) / IMAGE_STD[channel];
            }
        }

        let shape = [1usize, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];
        let pixel_tensor = Tensor::from_array((shape, pixels)).map_err(|e| {
            DomainError::embedding(format!("Failed to create pixel_values tensor: {}", e))
        })?;

        let mut session = self
            .vision_session
            .lock()
            .map_err(|e| DomainError::internal(format!("Failed to lock vision session: {}", e)))?;

        let outputs = session
            .run(ort::inputs!["pixel_values" => pixel_tensor])
            .map_err(|e| DomainError::embedding(format!("Vision inference failed: {}", e)))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| DomainError::embedding("No output tensor found"))?;
        let (shape, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| DomainError::embedding(format!("Failed to extract output tensor: {}", e)))?;
        let shape: Vec<usize> = shape.iter().map(|&x| x as usize).collect();

        single_row(&shape, data, self.config.dimensions())
    }
}

fn build_session(model_path: &Path) -> Result<Session, DomainError> {
    Session::builder()
        .map_err(|e| DomainError::internal(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| DomainError::internal(format!("Failed to set optimization level: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| DomainError::internal(format!("Failed to load ONNX model: {}", e)))
}

/// Validate a `[1, dims]` output row and L2-normalize it.
fn single_row(shape: &[usize], data: &[f32], dimensions: usize) -> Result<Vec<f32>, DomainError> {
    debug!("Output tensor shape: {:?}", shape);

    if shape.len() != 2 || shape[0] != 1 {
        return Err(DomainError::embedding(format!(
            "Unexpected output tensor shape: {:?}",
            shape
        )));
    }
    if shape[1] != dimensions {
        return Err(DomainError::dimension_mismatch(dimensions, shape[1]));
    }

    let mut embedding: Vec<f32> = data[..dimensions].to_vec();
    normalize(&mut embedding);
    Ok(embedding)
}

#[async_trait]
impl TextEmbedder for ClipEmbedding {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        self.encode_text(text)
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[async_trait]
impl ImageEmbedder for ClipEmbedding {
    async fn embed_image(&self, path: &Path) -> Result<Vec<f32>, DomainError> {
        self.encode_image(path)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires model download"]
    async fn test_clip_text_embedding() {
        let service = ClipEmbedding::new().expect("Failed to create service");

        let embedding = service.embed_text("a smartwatch with a black strap").await.unwrap();

        assert_eq!(embedding.len(), DEFAULT_DIMENSIONS);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }
}
