//! Storage configuration types
//!
//! Configuration for vector store backends and embedding generation.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::core::DistanceMetric;

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Vector store backend
    #[serde(default)]
    pub backend: StorageBackendType,
    /// PostgreSQL configuration
    pub postgres: Option<PostgresConfig>,
    /// Search and collection behaviour
    #[serde(default)]
    pub vector: VectorConfig,
}

/// Storage backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendType {
    /// In-memory (no persistence)
    Memory,
    /// PostgreSQL, with pgvector when enabled
    #[default]
    Postgres,
}

/// PostgreSQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Database URL; never written to disk, supplied by `DATABASE_URL`
    #[serde(skip_serializing, default = "default_url")]
    pub url: SecretString,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Use the pgvector extension; otherwise vectors are `REAL[]` scored in-process
    #[serde(default = "default_true")]
    pub enable_pgvector: bool,
    /// Prefix for per-collection table names
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
}

impl PostgresConfig {
    /// Create a config for the given URL with default pool settings
    pub fn new(url: impl Into<String>) -> Self {
        PostgresConfig {
            url: SecretString::from(url.into()),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
            enable_pgvector: true,
            table_prefix: default_table_prefix(),
        }
    }
}

fn default_url() -> SecretString {
    SecretString::from(String::new())
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_table_prefix() -> String {
    "memory_".to_string()
}

/// Vector search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Similarity function
    #[serde(default)]
    pub distance: DistanceMetric,
    /// Create collections on first upsert
    #[serde(default = "default_true")]
    pub auto_create_collections: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        VectorConfig {
            distance: DistanceMetric::default(),
            auto_create_collections: true,
        }
    }
}

/// Embedding provider type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible REST endpoint (see `provider`)
    #[default]
    Remote,
    /// In-process fastembed model
    Local,
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" | "openai" | "azure" => Ok(EmbeddingProviderType::Remote),
            "local" | "fastembed" => Ok(EmbeddingProviderType::Local),
            other => Err(format!("Unknown embedding provider: {}", other)),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding provider
    #[serde(default)]
    pub provider: EmbeddingProviderType,
    /// Embedding model, or embedding deployment name on Azure
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding dimensions; every collection uses this vector size
    #[serde(default = "default_embedding_dims")]
    pub dimensions: usize,
    /// Embedding cache
    #[serde(default)]
    pub cache: EmbeddingCacheConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            provider: EmbeddingProviderType::default(),
            model: default_embedding_model(),
            dimensions: default_embedding_dims(),
            cache: EmbeddingCacheConfig::default(),
        }
    }
}

pub(crate) fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

pub(crate) fn default_embedding_dims() -> usize {
    1536
}

/// Embedding cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingCacheConfig {
    /// Enable the in-process embedding cache
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum cached embeddings
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    /// Time to live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for EmbeddingCacheConfig {
    fn default() -> Self {
        EmbeddingCacheConfig {
            enabled: true,
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    1000
}

fn default_cache_ttl() -> u64 {
    30 * 60
}
