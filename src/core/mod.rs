//! Core module - Fundamental traits and types
//!
//! This module defines the abstractions that keep the memory pipeline loosely coupled:
//! - `VectorStore` for persistence backends
//! - `EmbeddingProvider` for text vectorization
//! - `ChatProvider` for chat completion / text generation
//!
//! Concrete implementations are chosen at composition time (see `services`).

pub mod embedding;
pub mod provider;
pub mod record;
pub mod similarity;
pub mod storage;
pub mod types;

// Re-export core traits for convenient access
pub use embedding::EmbeddingProvider;
pub use provider::{ChatProvider, ChatStream};
pub use record::{Metadata, ScoredRecord, VectorRecord};
pub use similarity::{cosine_similarity, DistanceMetric};
pub use storage::VectorStore;
pub use types::{GenerationOptions, Message, Role};
