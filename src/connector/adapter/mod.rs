mod clip_embedding;
mod gemini_client;
mod json_catalog_loader;
mod mock_embedding;

pub use clip_embedding::*;
pub use gemini_client::*;
pub use json_catalog_loader::*;
pub use mock_embedding::*;
