//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use secrecy::SecretString;

use super::types::provider::ProviderKind;
use super::types::storage::{PostgresConfig, StorageBackendType};
use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (config.json / config.toml) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    // Apply environment variable overrides (highest precedence)
    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
        // Parse as JSON5 (more lenient than strict JSON)
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        // Try JSON5 first, then TOML
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` if present, then overlays any set environment variables.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// First variable in `keys` that is set
fn first_of(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| lookup(key))
}

/// Overlay values from `lookup` (an environment view) onto the config
pub(crate) fn apply_overrides_from(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    // Provider overrides
    if let Some(kind) = lookup("OPENAI_PROVIDER_KIND") {
        if let Ok(kind) = kind.parse() {
            config.provider.kind = kind;
        }
    }
    if let Some(endpoint) = lookup("AZURE_OPENAI_ENDPOINT") {
        config.provider.kind = ProviderKind::Azure;
        config.provider.base_url = endpoint;
    } else if let Some(url) = lookup("OPENAI_BASE_URL") {
        config.provider.base_url = url;
    }
    if let Some(api_key) = first_of(&lookup, &["AZURE_OPENAI_API_KEY", "OPENAI_API_KEY"]) {
        config.provider.api_key = SecretString::from(api_key);
    }
    if let Some(version) = lookup("AZURE_OPENAI_API_VERSION") {
        config.provider.api_version = version;
    }
    if let Some(model) = first_of(&lookup, &["CHAT_MODEL", "AZURE_AI_CHAT_DEPLOYMENT_NAME"]) {
        config.provider.chat_model = model;
    }
    if let Some(timeout) = lookup("OPENAI_TIMEOUT") {
        if let Ok(v) = timeout.parse() {
            config.provider.timeout_secs = v;
        }
    }

    // Embedding overrides
    if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
        if let Ok(provider) = provider.parse() {
            config.embedding.provider = provider;
        }
    }
    if let Some(model) = first_of(&lookup, &["EMBEDDING_MODEL", "AZURE_AI_EMBEDDING_DEPLOYMENT_NAME"]) {
        config.embedding.model = model;
    }
    if let Some(dims) = lookup("VECTOR_DIMENSION") {
        if let Ok(v) = dims.parse() {
            config.embedding.dimensions = v;
        }
    }

    // Vector search overrides
    if let Some(metric) = lookup("DISTANCE_METRIC") {
        if let Ok(metric) = metric.parse() {
            config.storage.vector.distance = metric;
        }
    }
    if let Some(v) = lookup("AUTO_CREATE_COLLECTIONS") {
        config.storage.vector.auto_create_collections = v == "true" || v == "1";
    }

    // Database overrides
    if let Some(database_url) = first_of(&lookup, &["DATABASE_URL", "VECTOR_DB_URL"]) {
        let pg = config
            .storage
            .postgres
            .get_or_insert_with(|| PostgresConfig::new(String::new()));
        pg.url = SecretString::from(database_url);
        config.storage.backend = StorageBackendType::Postgres;
    }
    if let Some(max_conn) = lookup("DATABASE_MAX_CONNECTIONS") {
        if let Some(ref mut pg) = config.storage.postgres {
            if let Ok(v) = max_conn.parse() {
                pg.max_connections = v;
            }
        }
    }
    if let Some(timeout) = lookup("DATABASE_TIMEOUT") {
        if let Some(ref mut pg) = config.storage.postgres {
            if let Ok(v) = timeout.parse() {
                pg.connect_timeout_secs = v;
            }
        }
    }
    if let Some(v) = lookup("PGVECTOR_ENABLED") {
        if let Some(ref mut pg) = config.storage.postgres {
            pg.enable_pgvector = v != "false" && v != "0";
        }
    }
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().is_some_and(|ext| ext == "toml") {
        toml::to_string_pretty(config).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}
