//! Memory module - embedding generation, caching, and the semantic memory facade
//!
//! Provides remote (OpenAI/Azure) and local (fastembed) embeddings, an
//! in-process embedding cache (moka), and `SemanticMemory`, which pairs an
//! embedder with any `VectorStore`.

pub mod builder;
pub mod cache;
pub mod embedding;
pub mod openai;
pub mod semantic;

pub use builder::MemoryBuilder;
pub use cache::CachedEmbeddingProvider;
pub use embedding::{local_model_dimensions, LocalEmbeddingService, DEFAULT_LOCAL_MODEL};
pub use openai::OpenAiEmbeddingClient;
pub use semantic::{format_matches, MemoryMatch, SemanticMemory};
