//! # Semantic Memory
//!
//! Embedding-backed text memory over pluggable vector stores.
//!
//! ## Features
//!
//! - **Vector Store:** collection-scoped upsert/get/delete and ranked similarity search
//! - **PostgreSQL + pgvector:** durable collections with HNSW indexes, or `REAL[]` fallback
//! - **Semantic Memory:** save text and search by meaning through one facade
//! - **OpenAI / Azure OpenAI:** remote embeddings and streaming chat completions
//! - **Local Embeddings:** in-process fastembed models, no API key required
//!
//! ## Example
//!
//! ```no_run
//! use semantic_memory::{Config, Services};
//!
//! # async fn run() -> semantic_memory::Result<()> {
//! let config = Config::from_env()?;
//! let services = Services::init(&config).await?;
//!
//! services.memory.save("docs", "intro", "Rust has no garbage collector", Default::default()).await?;
//! let matches = services.memory.search("docs", "memory management", 3, 0.7).await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod core;
pub mod database;
pub mod error;
pub mod memory;
pub mod services;

pub use config::Config;
pub use core::{
    ChatProvider, DistanceMetric, EmbeddingProvider, Metadata, ScoredRecord, VectorRecord, VectorStore,
};
pub use error::{Error, Result};
pub use memory::{MemoryBuilder, MemoryMatch, SemanticMemory};
pub use services::Services;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
