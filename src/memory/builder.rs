//! Builder for `SemanticMemory`

use std::sync::Arc;

use super::semantic::SemanticMemory;
use crate::core::{EmbeddingProvider, VectorStore};
use crate::error::{Error, Result};

/// Assembles a `SemanticMemory` from a store and an embedder
#[derive(Default)]
pub struct MemoryBuilder {
    store: Option<Arc<dyn VectorStore>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl MemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the vector store
    pub fn with_memory_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the embedding provider
    pub fn with_embedding_provider(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Build the facade; both parts are required and must agree on dimension
    pub fn build(self) -> Result<SemanticMemory> {
        let store = self
            .store
            .ok_or_else(|| Error::Config("Semantic memory requires a vector store".into()))?;
        let embedder = self
            .embedder
            .ok_or_else(|| Error::Config("Semantic memory requires an embedding provider".into()))?;

        if store.dimension() != embedder.dimension() {
            return Err(Error::DimensionMismatch {
                expected: store.dimension(),
                actual: embedder.dimension(),
            });
        }

        Ok(SemanticMemory::new(store, embedder))
    }
}
