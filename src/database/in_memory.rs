//! In-process vector store
//!
//! Exact brute-force scan over all records of a collection. Nothing survives
//! the process; useful for tests and single-process deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::core::record::{ScoredRecord, VectorRecord};
use crate::core::similarity::DistanceMetric;
use crate::core::storage::{self, VectorStore};
use crate::error::{Error, Result};

/// A record plus the sequence number of its first insertion
#[derive(Debug, Clone)]
struct StoredRecord {
    seq: u64,
    record: VectorRecord,
}

#[derive(Debug, Default)]
struct Collection {
    records: HashMap<String, StoredRecord>,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Collection>,
    next_seq: u64,
}

impl State {
    fn put(&mut self, collection: &str, mut record: VectorRecord, now: chrono::DateTime<Utc>) -> String {
        record.timestamp = now;
        let id = record.id.clone();
        let next_seq = &mut self.next_seq;
        let records = &mut self.collections.entry(collection.to_string()).or_default().records;

        match records.get_mut(&id) {
            Some(existing) => existing.record = record,
            None => {
                *next_seq += 1;
                records.insert(id.clone(), StoredRecord { seq: *next_seq, record });
            }
        }
        id
    }
}

/// In-memory vector store
pub struct InMemoryVectorStore {
    dimension: usize,
    distance: DistanceMetric,
    auto_create: bool,
    state: RwLock<State>,
}

impl InMemoryVectorStore {
    /// Create a store for vectors of `dimension` with cosine similarity
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config("Vector dimension must be positive".into()));
        }

        Ok(InMemoryVectorStore {
            dimension,
            distance: DistanceMetric::default(),
            auto_create: true,
            state: RwLock::new(State::default()),
        })
    }

    /// Set the distance metric
    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    /// Enable or disable creating collections on first upsert
    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    fn check_writable(&self, state: &State, collection: &str) -> Result<()> {
        storage::validate_collection_name(collection)?;
        if !self.auto_create && !state.collections.contains_key(collection) {
            return Err(Error::CollectionNotFound(collection.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn id(&self) -> &str {
        "memory"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn distance(&self) -> DistanceMetric {
        self.distance
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        storage::validate_collection_name(name)?;
        let mut state = self.state.write().await;
        state.collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn does_collection_exist(&self, name: &str) -> Result<bool> {
        storage::validate_collection_name(name)?;
        let state = self.state.read().await;
        Ok(state.collections.contains_key(name))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        storage::validate_collection_name(name)?;
        let mut state = self.state.write().await;
        state.collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, record: VectorRecord) -> Result<String> {
        storage::validate_record(self.dimension, &record)?;

        let mut state = self.state.write().await;
        self.check_writable(&state, collection)?;
        Ok(state.put(collection, record, Utc::now()))
    }

    async fn upsert_batch(&self, collection: &str, records: Vec<VectorRecord>) -> Result<Vec<String>> {
        for record in &records {
            storage::validate_record(self.dimension, record)?;
        }

        let mut state = self.state.write().await;
        self.check_writable(&state, collection)?;

        let now = Utc::now();
        Ok(records
            .into_iter()
            .map(|record| state.put(collection, record, now))
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<VectorRecord> {
        storage::validate_collection_name(collection)?;
        let state = self.state.read().await;
        state
            .collections
            .get(collection)
            .and_then(|c| c.records.get(id))
            .map(|stored| stored.record.clone())
            .ok_or_else(|| Error::not_found(collection, id))
    }

    async fn get_batch(&self, collection: &str, ids: &[String]) -> Result<Vec<VectorRecord>> {
        storage::validate_collection_name(collection)?;
        let state = self.state.read().await;
        let Some(c) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<&StoredRecord> = ids.iter().filter_map(|id| c.records.get(id)).collect();
        found.sort_by_key(|stored| stored.seq);
        found.dedup_by_key(|stored| stored.seq);
        Ok(found.into_iter().map(|stored| stored.record.clone()).collect())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        storage::validate_collection_name(collection)?;
        let mut state = self.state.write().await;
        if let Some(c) = state.collections.get_mut(collection) {
            c.records.remove(id);
        }
        Ok(())
    }

    async fn delete_batch(&self, collection: &str, ids: &[String]) -> Result<()> {
        storage::validate_collection_name(collection)?;
        let mut state = self.state.write().await;
        if let Some(c) = state.collections.get_mut(collection) {
            for id in ids {
                c.records.remove(id);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
        min_relevance_score: f64,
    ) -> Result<Vec<ScoredRecord>> {
        storage::validate_query(self.dimension, query, top_k)?;
        storage::validate_collection_name(collection)?;

        let state = self.state.read().await;
        let Some(c) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(storage::rank(
            self.distance,
            query,
            c.records
                .values()
                .map(|stored| (stored.seq, stored.record.clone())),
            top_k,
            min_relevance_score,
        ))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
