mod catalog_source;
mod chat_client;
mod image_embedder;
mod text_embedder;

pub use catalog_source::*;
pub use chat_client::*;
pub use image_embedder::*;
pub use text_embedder::*;
