//! PostgreSQL database connection and setup

use crate::config::PostgresConfig;
use crate::error::{Error, Result};
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// PostgreSQL connection pool type alias
pub type PostgresPool = PgPool;

/// Initialize the PostgreSQL connection pool
///
/// Checks for the pgvector extension when `enable_pgvector` is set.
pub async fn init_pool(config: &PostgresConfig) -> Result<PostgresPool> {
    init_pool_with_options(config, config.enable_pgvector).await
}

/// Initialize the PostgreSQL connection pool without pgvector check
/// Use this for running migrations before pgvector is installed
pub async fn init_pool_for_migrations(config: &PostgresConfig) -> Result<PostgresPool> {
    init_pool_with_options(config, false).await
}

/// Initialize the PostgreSQL connection pool with options
async fn init_pool_with_options(config: &PostgresConfig, require_pgvector: bool) -> Result<PostgresPool> {
    info!("Initializing PostgreSQL connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(config.url.expose_secret())
        .await?;

    // Verify connection and optionally check for required extensions
    verify_database(&pool, require_pgvector).await?;

    info!("PostgreSQL connection pool initialized successfully");
    Ok(pool)
}

/// Verify database connection and optionally check for required extensions
async fn verify_database(pool: &PgPool, require_pgvector: bool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    if require_pgvector && !has_pgvector(pool).await? {
        return Err(Error::StoreConnection(sqlx::Error::Configuration(
            "pgvector extension is not installed. Run: CREATE EXTENSION vector;".into(),
        )));
    }

    Ok(())
}

/// Whether the `vector` extension is installed
pub async fn has_pgvector(pool: &PgPool) -> Result<bool> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT extname::text FROM pg_extension WHERE extname = 'vector'")
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

/// Database migrations
///
/// Collection tables are created on demand by the vector store, so the only
/// global step is enabling pgvector.
pub mod migrations {
    use super::*;
    use tracing::warn;

    /// Run all migrations
    pub async fn run(pool: &PgPool, enable_pgvector: bool) -> Result<()> {
        info!("Running database migrations");

        if enable_pgvector {
            // Requires superuser or the extension already being available
            match sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
                .execute(pool)
                .await
            {
                Ok(_) => info!("pgvector extension enabled"),
                Err(e) => {
                    warn!("Could not create pgvector extension: {}. Native vector search will not work.", e);
                    warn!("Run as superuser: CREATE EXTENSION vector; or set PGVECTOR_ENABLED=false");
                }
            }
        }

        info!("Database migrations completed");
        Ok(())
    }
}
