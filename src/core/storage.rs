//! Storage traits - Abstract interface for vector memory backends
//!
//! `VectorStore` is the only seam touching durable storage. Implementations:
//! - PostgreSQL, with pgvector operators or a `REAL[]` column scored in-process
//! - In-memory, exact brute-force scan
//!
//! The contract fixes ordering and thresholding, not the index algorithm, so
//! exact scans and approximate indexes are both conforming.

use async_trait::async_trait;

use super::record::{ScoredRecord, VectorRecord};
use super::similarity::DistanceMetric;
use crate::error::{Error, Result};

/// Longest accepted collection name
pub const MAX_COLLECTION_NAME_LEN: usize = 48;

/// Abstract interface for collection-scoped vector storage
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the backend ID
    fn id(&self) -> &str;

    /// Configured vector dimension
    fn dimension(&self) -> usize;

    /// Distance metric used for search
    fn distance(&self) -> DistanceMetric;

    /// Create a collection (idempotent)
    async fn create_collection(&self, name: &str) -> Result<()>;

    /// Check whether a collection exists
    async fn does_collection_exist(&self, name: &str) -> Result<bool>;

    /// List all collection names
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Drop a collection and its records (idempotent)
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or replace a record, returning its ID
    async fn upsert(&self, collection: &str, record: VectorRecord) -> Result<String>;

    /// Insert or replace several records; nothing is written if any record is invalid
    async fn upsert_batch(&self, collection: &str, records: Vec<VectorRecord>) -> Result<Vec<String>>;

    /// Get a record by ID
    async fn get(&self, collection: &str, id: &str) -> Result<VectorRecord>;

    /// Get several records; missing IDs are skipped
    async fn get_batch(&self, collection: &str, ids: &[String]) -> Result<Vec<VectorRecord>>;

    /// Delete a record (idempotent)
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Delete several records (idempotent)
    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<()>;

    /// Nearest-neighbour search, descending by score
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
        min_relevance_score: f64,
    ) -> Result<Vec<ScoredRecord>>;

    /// Best single match above the threshold
    async fn search_one(
        &self,
        collection: &str,
        query: &[f32],
        min_relevance_score: f64,
    ) -> Result<Option<ScoredRecord>> {
        let mut results = self.search(collection, query, 1, min_relevance_score).await?;
        Ok(if results.is_empty() {
            None
        } else {
            Some(results.swap_remove(0))
        })
    }

    /// Health check
    async fn health_check(&self) -> Result<bool>;
}

/// Validate a collection name; names end up as SQL identifiers
pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_COLLECTION_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "Collection name must be 1-{} characters: '{}'",
            MAX_COLLECTION_NAME_LEN, name
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::InvalidInput(format!(
            "Collection name may only contain ASCII letters, digits, '_' or '-': '{}'",
            name
        )));
    }

    Ok(())
}

/// Check a vector against the configured dimension
pub fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Validate a record before it is written
pub fn validate_record(expected: usize, record: &VectorRecord) -> Result<()> {
    if record.id.is_empty() {
        return Err(Error::InvalidInput("Record ID must not be empty".into()));
    }
    check_dimension(expected, &record.embedding)
}

/// Validate search arguments
pub fn validate_query(expected: usize, query: &[f32], top_k: usize) -> Result<()> {
    if query.is_empty() {
        return Err(Error::InvalidInput("Query vector must not be empty".into()));
    }
    if top_k == 0 {
        return Err(Error::InvalidInput("top_k must be positive".into()));
    }
    check_dimension(expected, query)
}

/// Rank candidates by score, stable on insertion order, then threshold and truncate.
///
/// Each candidate carries its insertion sequence number.
pub fn rank(
    metric: DistanceMetric,
    query: &[f32],
    candidates: impl IntoIterator<Item = (u64, VectorRecord)>,
    top_k: usize,
    min_relevance_score: f64,
) -> Vec<ScoredRecord> {
    let mut scored: Vec<(u64, ScoredRecord)> = candidates
        .into_iter()
        .filter_map(|(seq, record)| {
            let score = metric.score(query, &record.embedding);
            (score >= min_relevance_score).then_some((seq, ScoredRecord { record, score }))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(top_k);

    scored.into_iter().map(|(_, r)| r).collect()
}
