//! Local embedding generation via fastembed
//!
//! Runs the model in-process; no API key required. The default model is
//! multilingual-e5-small (384 dimensions, ~90MB), which auto-downloads on
//! first use.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use tracing::info;

use crate::core::embedding::{single_embedding, EmbeddingProvider};
use crate::error::{Error, Result};

/// Default local model
pub const DEFAULT_LOCAL_MODEL: &str = "multilingual-e5-small";

/// Resolve a local model name to its fastembed model and output dimensions
fn resolve_model(model: &str) -> Option<(EmbeddingModel, usize)> {
    let resolved = match model.to_lowercase().as_str() {
        "multilingual-e5-small" | "intfloat/multilingual-e5-small" => (EmbeddingModel::MultilingualE5Small, 384),
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => (EmbeddingModel::AllMiniLML6V2, 384),
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
        "bge-base-en-v1.5" | "baai/bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
        "nomic-embed-text-v1.5" | "nomic-ai/nomic-embed-text-v1.5" => (EmbeddingModel::NomicEmbedTextV15, 768),
        _ => return None,
    };
    Some(resolved)
}

/// Output dimensions of a supported local model, `None` if the model is unknown
pub fn local_model_dimensions(model: &str) -> Option<usize> {
    resolve_model(model).map(|(_, dimensions)| dimensions)
}

/// Local embedding service wrapping fastembed
#[derive(Clone)]
pub struct LocalEmbeddingService {
    model: Arc<TextEmbedding>,
    name: String,
    dimensions: usize,
}

impl LocalEmbeddingService {
    /// Create a service with the default model
    pub fn new() -> Result<Self> {
        Self::with_model(DEFAULT_LOCAL_MODEL)
    }

    /// Create a service for a named model; downloads it if not cached
    pub fn with_model(name: &str) -> Result<Self> {
        let (model, dimensions) = resolve_model(name)
            .ok_or_else(|| Error::Config(format!("Unsupported local embedding model: {}", name)))?;

        info!("Loading local embedding model {} ({} dims)", name, dimensions);
        let model = TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(true))
            .map_err(|e| Error::Embedding(format!("Failed to init embedding model: {}", e)))?;

        Ok(LocalEmbeddingService {
            model: Arc::new(model),
            name: name.to_string(),
            dimensions,
        })
    }

    /// Model name
    pub fn model(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingService {
    fn dimension(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        single_embedding(self.embed_batch(&[text.to_string()]).await?)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model.clone();
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            model
                .embed(texts, None)
                .map_err(|e| Error::Embedding(format!("Batch embedding error: {}", e)))
        })
        .await
        .map_err(|e| Error::Embedding(format!("Embedding task join error: {}", e)))?
    }
}
