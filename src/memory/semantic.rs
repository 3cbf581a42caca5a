//! Semantic memory facade
//!
//! Composes an embedding provider with a vector store: text goes in, ranked
//! text comes out. Embedding and upsert are two separate steps with no
//! transaction spanning them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::{EmbeddingProvider, Metadata, ScoredRecord, VectorRecord, VectorStore};
use crate::error::{Error, Result};

/// A memory as returned to callers, without its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMatch {
    /// Record ID
    pub id: String,
    /// Original text
    pub text: String,
    /// Stored metadata
    pub metadata: Metadata,
    /// Optional description
    pub description: Option<String>,
    /// External source for reference records
    pub external_source_name: Option<String>,
    /// Whether the record points to an external document
    pub is_reference: bool,
    /// Relevance score; `None` for direct lookups
    pub score: Option<f64>,
}

impl From<VectorRecord> for MemoryMatch {
    fn from(record: VectorRecord) -> Self {
        MemoryMatch {
            id: record.id,
            text: record.text,
            metadata: record.metadata,
            description: record.description,
            external_source_name: record.external_source_name,
            is_reference: record.is_reference,
            score: None,
        }
    }
}

impl From<ScoredRecord> for MemoryMatch {
    fn from(scored: ScoredRecord) -> Self {
        MemoryMatch {
            score: Some(scored.score),
            ..MemoryMatch::from(scored.record)
        }
    }
}

/// Text-in, text-out memory over a vector store
#[derive(Clone)]
pub struct SemanticMemory {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SemanticMemory {
    /// Create a facade over a store and an embedder
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        SemanticMemory { store, embedder }
    }

    /// Embed and store a text, returning its ID
    pub async fn save(&self, collection: &str, id: &str, text: &str, metadata: Metadata) -> Result<String> {
        let embedding = self.embedder.embed(text).await?;
        let record = VectorRecord::new(id, text, embedding).with_metadata(metadata);

        let id = self.store.upsert(collection, record).await?;
        debug!("Saved memory {} in {}", id, collection);
        Ok(id)
    }

    /// Embed and store a reference to a document held by an external source
    pub async fn save_reference(
        &self,
        collection: &str,
        id: &str,
        text: &str,
        external_source_name: &str,
        description: Option<&str>,
        metadata: Metadata,
    ) -> Result<String> {
        let embedding = self.embedder.embed(text).await?;
        let mut record = VectorRecord::new(id, text, embedding)
            .with_metadata(metadata)
            .as_reference(external_source_name);
        if let Some(description) = description {
            record = record.with_description(description);
        }

        let id = self.store.upsert(collection, record).await?;
        debug!("Saved reference {} ({}) in {}", id, external_source_name, collection);
        Ok(id)
    }

    /// Embed several texts in one provider call and store them together.
    ///
    /// Items are `(id, text, metadata)`; returns the stored IDs in input order.
    pub async fn save_batch(
        &self,
        collection: &str,
        items: Vec<(String, String, Metadata)>,
    ) -> Result<Vec<String>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = items.iter().map(|(_, text, _)| text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != items.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                items.len(),
                embeddings.len()
            )));
        }

        let records = items
            .into_iter()
            .zip(embeddings)
            .map(|((id, text, metadata), embedding)| {
                VectorRecord::new(id, text, embedding).with_metadata(metadata)
            })
            .collect();

        let ids = self.store.upsert_batch(collection, records).await?;
        info!("Saved {} memories in {}", ids.len(), collection);
        Ok(ids)
    }

    /// Ranked matches for a query text, best first
    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
        min_relevance_score: f64,
    ) -> Result<Vec<MemoryMatch>> {
        let embedding = self.embedder.embed(query).await?;
        let results = self
            .store
            .search(collection, &embedding, top_k, min_relevance_score)
            .await?;

        info!("Retrieved {} memories from {}", results.len(), collection);
        Ok(results.into_iter().map(MemoryMatch::from).collect())
    }

    /// Ranked matches formatted as a context block for a prompt
    pub async fn recall(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
        min_relevance_score: f64,
    ) -> Result<String> {
        let matches = self.search(collection, query, top_k, min_relevance_score).await?;
        Ok(format_matches(&matches))
    }

    /// Get a memory by ID
    pub async fn get(&self, collection: &str, id: &str) -> Result<MemoryMatch> {
        self.store.get(collection, id).await.map(MemoryMatch::from)
    }

    /// Remove a memory (idempotent)
    pub async fn remove(&self, collection: &str, id: &str) -> Result<()> {
        self.store.delete(collection, id).await?;
        debug!("Removed memory {} from {}", id, collection);
        Ok(())
    }

    /// List collection names
    pub async fn collections(&self) -> Result<Vec<String>> {
        self.store.list_collections().await
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Underlying embedder
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }
}

/// Format matches into a context block for injection into a system prompt
pub fn format_matches(matches: &[MemoryMatch]) -> String {
    if matches.is_empty() {
        return String::new();
    }

    let mut output = String::from("\n\n---\n\n## Relevant Memories\n\n");

    for (i, m) in matches.iter().enumerate() {
        output.push_str(&format!("{}. {}", i + 1, m.text));
        if let Some(source) = &m.external_source_name {
            output.push_str(&format!(" (source: {})", source));
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryVectorStore;
    use async_trait::async_trait;

    /// Maps known words onto fixed axes; "fail" makes the provider error
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("fail") {
                return Err(Error::Embedding("provider unavailable".into()));
            }
            let axis = |word: &str| if text.contains(word) { 1.0 } else { 0.0 };
            Ok(vec![axis("rust"), axis("postgres"), axis("cooking") + 0.01])
        }
    }

    /// Drops the first text of every batch
    struct ShortBatchEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ShortBatchEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
    }

    fn memory() -> SemanticMemory {
        let store = Arc::new(InMemoryVectorStore::new(3).unwrap());
        SemanticMemory::new(store, Arc::new(KeywordEmbedder))
    }

    #[tokio::test]
    async fn test_save_then_search() {
        let memory = memory();
        memory
            .save("notes", "1", "rust ownership rules", Metadata::new())
            .await
            .unwrap();
        memory
            .save("notes", "2", "postgres index tuning", Metadata::new())
            .await
            .unwrap();

        let results = memory.search("notes", "learning rust", 1, 0.5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "1");
        assert_eq!(results[0].text, "rust ownership rules");
        assert!(results[0].score.unwrap() > 0.99);
    }

    #[tokio::test]
    async fn test_search_empty_collection() {
        let memory = memory();
        let results = memory.search("empty", "rust", 5, 0.0).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(memory.recall("empty", "rust", 5, 0.0).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_store_untouched() {
        let memory = memory();
        let err = memory
            .save("notes", "1", "this will fail", Metadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));

        assert!(memory.collections().await.unwrap().is_empty());
        assert!(memory.get("notes", "1").await.is_err());
    }

    #[tokio::test]
    async fn test_save_batch_rejects_short_embedding_batch() {
        let store = Arc::new(InMemoryVectorStore::new(3).unwrap());
        let memory = SemanticMemory::new(store.clone(), Arc::new(ShortBatchEmbedder));

        let items = vec![
            ("a".to_string(), "first".to_string(), Metadata::new()),
            ("b".to_string(), "second".to_string(), Metadata::new()),
        ];
        let err = memory.save_batch("notes", items).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(msg) if msg == "Expected 2 embeddings, got 1"));

        assert!(!store.does_collection_exist("notes").await.unwrap());
        assert!(memory.get("notes", "a").await.is_err());
        assert!(memory.get("notes", "b").await.is_err());
    }

    #[tokio::test]
    async fn test_get_and_remove() {
        let memory = memory();
        let mut metadata = Metadata::new();
        metadata.insert("lang".into(), "en".into());
        memory.save("notes", "1", "rust", metadata).await.unwrap();

        let found = memory.get("notes", "1").await.unwrap();
        assert_eq!(found.text, "rust");
        assert_eq!(found.metadata.get("lang").map(String::as_str), Some("en"));
        assert_eq!(found.score, None);

        memory.remove("notes", "1").await.unwrap();
        memory.remove("notes", "1").await.unwrap();
        assert!(matches!(
            memory.get("notes", "1").await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_reference() {
        let memory = memory();
        memory
            .save_reference(
                "docs",
                "readme",
                "postgres setup guide",
                "github",
                Some("README.md"),
                Metadata::new(),
            )
            .await
            .unwrap();

        let found = memory.get("docs", "readme").await.unwrap();
        assert!(found.is_reference);
        assert_eq!(found.external_source_name.as_deref(), Some("github"));
        assert_eq!(found.description.as_deref(), Some("README.md"));

        let context = memory.recall("docs", "postgres", 3, 0.5).await.unwrap();
        assert!(context.contains("## Relevant Memories"));
        assert!(context.contains("1. postgres setup guide (source: github)"));
    }

    #[tokio::test]
    async fn test_save_batch() {
        let memory = memory();
        let ids = memory
            .save_batch(
                "notes",
                vec![
                    ("a".into(), "rust".into(), Metadata::new()),
                    ("b".into(), "cooking".into(), Metadata::new()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(ids, vec!["a", "b"]);

        let results = memory.search("notes", "cooking", 5, 0.5).await.unwrap();
        assert_eq!(results[0].id, "b");
    }

    #[test]
    fn test_format_matches_empty() {
        assert_eq!(format_matches(&[]), "");
    }
}
