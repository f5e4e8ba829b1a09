//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Embedding generation (CLIP via ONNX Runtime, mock for tests)
//! - Catalog ingestion (product JSON files)
//! - Index storage (flat exact-L2 index with bincode persistence)
//! - Answer generation (Gemini HTTP client)
//! - HTTP API (axum)

pub mod adapter;
pub mod api;
pub mod storage;

pub use adapter::*;
pub use storage::*;
