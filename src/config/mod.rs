//! Configuration module
//!
//! - types/mod.rs: Root `Config`
//! - types/provider.rs: OpenAI / Azure OpenAI service configuration
//! - types/storage.rs: Vector store and embedding configuration
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

// Re-export core config types
pub use types::Config;

// Re-export provider types
pub use types::provider::{ProviderConfig, ProviderKind};

// Re-export storage types
pub use types::storage::{
    EmbeddingCacheConfig, EmbeddingConfig, EmbeddingProviderType, PostgresConfig, StorageBackendType,
    StorageConfig, VectorConfig,
};

// Re-export IO and utilities
pub use io::{apply_env_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
