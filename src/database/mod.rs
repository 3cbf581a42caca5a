//! Database module - vector store backends
//!
//! - PostgreSQL with pgvector: durable collections with native similarity operators
//! - PostgreSQL without pgvector: `REAL[]` columns, similarity computed in-process
//! - In-memory: process-lifetime collections for tests and local use

mod in_memory;
mod postgres;
mod vector_store;

pub use in_memory::InMemoryVectorStore;
pub use postgres::{has_pgvector, init_pool, init_pool_for_migrations, migrations, PostgresPool};
pub use vector_store::PostgresVectorStore;
