//! In-process embedding cache
//!
//! Uses moka async cache (Send + Sync, TTL-based eviction). Repeated saves
//! and queries of the same text skip the provider round-trip.

use async_trait::async_trait;
use moka::future::Cache;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::config::EmbeddingCacheConfig;
use crate::core::embedding::EmbeddingProvider;
use crate::error::{Error, Result};

/// Cache key helper: hash a string to u64
fn hash_key(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Embedding provider decorator that memoizes vectors by text
#[derive(Clone)]
pub struct CachedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    /// hash(text) -> embedding
    embeddings: Cache<u64, Vec<f32>>,
}

impl CachedEmbeddingProvider {
    /// Wrap a provider with the default cache settings
    pub fn new(inner: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_config(inner, &EmbeddingCacheConfig::default())
    }

    /// Wrap a provider with explicit capacity and TTL
    pub fn with_config(inner: Arc<dyn EmbeddingProvider>, config: &EmbeddingCacheConfig) -> Self {
        CachedEmbeddingProvider {
            inner,
            embeddings: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(Duration::from_secs(config.ttl_secs))
                .build(),
        }
    }

    /// Number of cached entries (approximate until pending tasks run)
    pub fn entry_count(&self) -> u64 {
        self.embeddings.entry_count()
    }

    /// Drop every cached embedding
    pub fn invalidate_all(&self) {
        self.embeddings.invalidate_all();
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = hash_key(text);
        if let Some(embedding) = self.embeddings.get(&key).await {
            trace!("Embedding cache hit");
            return Ok(embedding);
        }

        let embedding = self.inner.embed(text).await?;
        self.embeddings.insert(key, embedding.clone()).await;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let cached = self.embeddings.get(&hash_key(text)).await;
            if cached.is_none() {
                missing.push(i);
            }
            results.push(cached);
        }

        if !missing.is_empty() {
            let pending: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let fresh = self.inner.embed_batch(&pending).await?;
            if fresh.len() != pending.len() {
                return Err(Error::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    pending.len(),
                    fresh.len()
                )));
            }
            for (i, embedding) in missing.into_iter().zip(fresh) {
                self.embeddings.insert(hash_key(&texts[i]), embedding.clone()).await;
                results[i] = Some(embedding);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }
}
