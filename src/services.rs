//! Service wiring
//!
//! Resolves `Config` into concrete clients, a vector store and the
//! `SemanticMemory` facade. The Postgres pool is created once here and
//! closed by `Services::shutdown`.

use std::sync::Arc;
use tracing::{info, warn};

use crate::agent::ChatCompletionClient;
use crate::config::{Config, EmbeddingProviderType, StorageBackendType};
use crate::core::{ChatProvider, EmbeddingProvider, VectorStore};
use crate::database::{init_pool, InMemoryVectorStore, PostgresPool, PostgresVectorStore};
use crate::error::{Error, Result};
use crate::memory::{CachedEmbeddingProvider, LocalEmbeddingService, MemoryBuilder, OpenAiEmbeddingClient, SemanticMemory};

/// Fully wired application services
#[derive(Clone)]
pub struct Services {
    /// Chat completion provider
    pub chat: Arc<dyn ChatProvider>,
    /// Embedding provider (cached when enabled)
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Vector store backend
    pub store: Arc<dyn VectorStore>,
    /// Semantic memory facade over `embedder` and `store`
    pub memory: SemanticMemory,
    /// Shared pool when the Postgres backend is in use
    pool: Option<PostgresPool>,
}

impl Services {
    /// Build every service from configuration
    pub async fn init(config: &Config) -> Result<Self> {
        let chat: Arc<dyn ChatProvider> = Arc::new(ChatCompletionClient::new(config.provider.clone())?);
        let embedder = build_embedder(config)?;
        let (store, pool) = build_store(config).await?;

        let memory = MemoryBuilder::new()
            .with_memory_store(store.clone())
            .with_embedding_provider(embedder.clone())
            .build()?;

        info!(
            "Services initialized: chat={} ({}), store={}, dimension={}",
            chat.id(),
            chat.default_model(),
            store.id(),
            store.dimension()
        );

        Ok(Services {
            chat,
            embedder,
            store,
            memory,
            pool,
        })
    }

    /// Postgres pool, if the Postgres backend is in use
    pub fn pool(&self) -> Option<&PostgresPool> {
        self.pool.as_ref()
    }

    /// Release pooled connections
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            info!("Closing PostgreSQL connection pool");
            pool.close().await;
        }
    }
}

fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedding = &config.embedding;

    let embedder: Arc<dyn EmbeddingProvider> = match embedding.provider {
        EmbeddingProviderType::Remote => Arc::new(OpenAiEmbeddingClient::new(
            &config.provider,
            embedding.model.clone(),
            embedding.dimensions,
        )?),
        EmbeddingProviderType::Local => Arc::new(LocalEmbeddingService::with_model(&embedding.model)?),
    };

    if embedding.cache.enabled {
        let cached: Arc<dyn EmbeddingProvider> =
            Arc::new(CachedEmbeddingProvider::with_config(embedder, &embedding.cache));
        Ok(cached)
    } else {
        Ok(embedder)
    }
}

async fn build_store(config: &Config) -> Result<(Arc<dyn VectorStore>, Option<PostgresPool>)> {
    let dimension = config.embedding.dimensions;
    let vector = &config.storage.vector;

    match config.storage.backend {
        StorageBackendType::Memory => {
            warn!("Using in-memory vector store; records are lost on exit");
            let store = InMemoryVectorStore::new(dimension)?
                .with_distance(vector.distance)
                .with_auto_create(vector.auto_create_collections);
            let store: Arc<dyn VectorStore> = Arc::new(store);
            Ok((store, None))
        }
        StorageBackendType::Postgres => {
            let pg = config.storage.postgres.as_ref().ok_or_else(|| {
                Error::Config("Postgres backend selected but not configured. Set DATABASE_URL.".into())
            })?;

            let pool = init_pool(pg).await?;
            let store = PostgresVectorStore::new(pool.clone(), dimension)?
                .with_distance(vector.distance)
                .with_auto_create(vector.auto_create_collections)
                .with_pgvector(pg.enable_pgvector)
                .with_table_prefix(pg.table_prefix.clone())?;
            let store: Arc<dyn VectorStore> = Arc::new(store);
            Ok((store, Some(pool)))
        }
    }
}
