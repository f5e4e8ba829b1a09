pub mod application;
pub mod connector;
pub mod domain;

pub use application::{
    AnswerQuestionUseCase, BuildIndexUseCase, CatalogSource, ChatClient, ImageEmbedder,
    JointSpaceBuilder, RetrieveUseCase, TextEmbedder,
};

pub use connector::{
    ClipEmbedding, GeminiClient, IndexStore, JsonCatalogLoader, MockImageEmbedder,
    MockTextEmbedder,
};

pub use domain::{
    Chunk, ChunkMetadata, DomainError, EmbeddingConfig, SearchResult,
};
