//! Error types for semantic memory

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for semantic memory operations
#[derive(Error, Debug)]
pub enum Error {
    /// Vector length does not match the store's configured dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension
        expected: usize,
        /// Length of the offending vector
        actual: usize,
    },

    /// Collection exists with a different dimension than configured
    #[error("Invalid dimension for collection '{collection}': store expects {expected}, collection has {actual}")]
    InvalidDimension {
        /// Collection name
        collection: String,
        /// Dimension the store is configured for
        expected: usize,
        /// Dimension found on the existing collection
        actual: usize,
    },

    /// Collection does not exist and auto-create is disabled
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Record not found in a collection
    #[error("Record '{id}' not found in collection '{collection}'")]
    NotFound {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
    },

    /// Embedding provider failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Storage connection or query failure
    #[error("Store connection error: {0}")]
    StoreConnection(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat completion provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a `NotFound` error
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::RateLimit(_)
                | Error::Timeout(_)
                | Error::StoreConnection(_)
        )
    }

    /// Check if error is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::NotFound { .. }
                | Error::CollectionNotFound(_)
                | Error::DimensionMismatch { .. }
                | Error::Unauthorized(_)
        )
    }
}
