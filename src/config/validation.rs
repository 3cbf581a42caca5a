//! Configuration validation
//!
//! Validates configuration and reports issues.

use secrecy::ExposeSecret;

use super::types::storage::{EmbeddingProviderType, StorageBackendType};
use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_provider_config(config, result);
    result = validate_embedding_config(config, result);
    result = validate_storage_config(config, result);

    result
}

fn validate_provider_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.provider.api_key.expose_secret().is_empty() {
        result = result.with_warning(
            ValidationIssue::new(
                "provider.api_key",
                "No API key configured. Chat completion and remote embeddings will fail.",
            )
            .with_suggestion("Set OPENAI_API_KEY or AZURE_OPENAI_API_KEY"),
        );
    }

    if url::Url::parse(&config.provider.base_url).is_err() {
        result = result.with_error(
            ValidationIssue::new(
                "provider.base_url",
                format!("Not a valid URL: {}", config.provider.base_url),
            ),
        );
    }

    result
}

fn validate_embedding_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.embedding.dimensions == 0 {
        result = result.with_error(
            ValidationIssue::new("embedding.dimensions", "Vector dimension must be positive")
                .with_suggestion("Set VECTOR_DIMENSION, e.g. 1536 for text-embedding-ada-002"),
        );
    }

    if config.embedding.provider == EmbeddingProviderType::Local {
        match crate::memory::embedding::local_model_dimensions(&config.embedding.model) {
            None => {
                result = result.with_error(ValidationIssue::new(
                    "embedding.model",
                    format!("Unknown local embedding model: {}", config.embedding.model),
                ));
            }
            Some(dims) if dims != config.embedding.dimensions => {
                result = result.with_error(
                    ValidationIssue::new(
                        "embedding.dimensions",
                        format!(
                            "Local model {} produces {} dimensions, configured {}",
                            config.embedding.model, dims, config.embedding.dimensions
                        ),
                    )
                    .with_suggestion(format!("Set VECTOR_DIMENSION={}", dims)),
                );
            }
            Some(_) => {}
        }
    }

    result
}

fn validate_storage_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.storage.backend == StorageBackendType::Postgres {
        match config.storage.postgres {
            None => {
                result = result.with_error(
                    ValidationIssue::new(
                        "storage.postgres",
                        "PostgreSQL backend selected but not configured",
                    )
                    .with_suggestion("Set DATABASE_URL environment variable or configure storage.postgres"),
                );
            }
            Some(ref pg) if pg.url.expose_secret().is_empty() => {
                result = result.with_error(
                    ValidationIssue::new("storage.postgres.url", "Connection string is empty")
                        .with_suggestion("Set DATABASE_URL"),
                );
            }
            Some(_) => {}
        }
    }

    if config.storage.backend == StorageBackendType::Memory {
        result = result.with_warning(ValidationIssue::new(
            "storage.backend",
            "In-memory backend selected. Records are lost when the process exits.",
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PostgresConfig;

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.storage.backend = StorageBackendType::Memory;
        config
    }

    #[test]
    fn test_validate_default_config() {
        // Postgres is the default backend and needs DATABASE_URL
        let result = validate_config(&Config::default());
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "storage.postgres"));
    }

    #[test]
    fn test_validate_memory_config() {
        let result = validate_config(&memory_config());
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.iter().any(|w| w.path == "storage.backend"));
    }

    #[test]
    fn test_postgres_without_url() {
        let mut config = Config::default();
        assert!(!validate_config(&config).valid);

        config.storage.postgres = Some(PostgresConfig::new(""));
        let result = validate_config(&config);
        assert!(result.errors.iter().any(|e| e.path == "storage.postgres.url"));

        config.storage.postgres = Some(PostgresConfig::new("postgres://localhost/db"));
        assert!(validate_config(&config).valid);
    }

    #[test]
    fn test_local_model_dimension_mismatch() {
        let mut config = memory_config();
        config.embedding.provider = EmbeddingProviderType::Local;
        config.embedding.model = "multilingual-e5-small".into();

        let result = validate_config(&config);
        assert!(result.errors.iter().any(|e| e.path == "embedding.dimensions"));

        config.embedding.dimensions = 384;
        assert!(validate_config(&config).valid);
    }

    #[test]
    fn test_zero_dimension() {
        let mut config = memory_config();
        config.embedding.dimensions = 0;
        assert!(!validate_config(&config).valid);
    }
}
