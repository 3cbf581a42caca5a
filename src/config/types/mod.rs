//! Configuration types module

pub mod provider;
pub mod storage;

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat / embedding service configuration
    #[serde(default)]
    pub provider: provider::ProviderConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: storage::EmbeddingConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: storage::StorageConfig,
}

impl Config {
    /// Load configuration from environment variables and files
    ///
    /// Layers, lowest precedence first:
    /// 1. Default values
    /// 2. Config file (if present)
    /// 3. Environment variable overrides
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.provider.chat_model, "gpt-35-turbo");
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.embedding.dimensions, 1536);
    }

    #[test]
    fn test_config_partial_deserialize() {
        let config: Config = serde_json::from_str(
            r#"{ "embedding": { "dimensions": 384, "provider": "local", "model": "bge-small-en-v1.5" } }"#,
        )
        .unwrap();
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.embedding.provider, storage::EmbeddingProviderType::Local);
        assert_eq!(config.provider.chat_model, "gpt-35-turbo");
    }
}
