//! Stored unit of the vector memory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata attached to a record
pub type Metadata = HashMap<String, String>;

/// A text fragment, its embedding and associated metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique ID within the collection
    pub id: String,
    /// Source text
    pub text: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Free-form string metadata
    #[serde(default)]
    pub metadata: Metadata,
    /// Optional description of the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the external system holding the original document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_source_name: Option<String>,
    /// Whether this record points to an external document rather than holding it
    #[serde(default)]
    pub is_reference: bool,
    /// Creation or last update time, set by the store on upsert
    pub timestamp: DateTime<Utc>,
}

impl VectorRecord {
    /// Create a new record
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        VectorRecord {
            id: id.into(),
            text: text.into(),
            embedding,
            metadata: Metadata::new(),
            description: None,
            external_source_name: None,
            is_reference: false,
            timestamp: Utc::now(),
        }
    }

    /// Replace the metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add a single metadata entry
    pub fn add_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark as a reference to a document held by an external source
    pub fn as_reference(mut self, external_source_name: impl Into<String>) -> Self {
        self.external_source_name = Some(external_source_name.into());
        self.is_reference = true;
        self
    }

    /// Vector length
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }

    /// Equality ignoring the timestamp
    pub fn same_content(&self, other: &VectorRecord) -> bool {
        self.id == other.id
            && self.text == other.text
            && self.embedding == other.embedding
            && self.metadata == other.metadata
            && self.description == other.description
            && self.external_source_name == other.external_source_name
            && self.is_reference == other.is_reference
    }
}

/// A record returned by a similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// The matching record
    pub record: VectorRecord,
    /// Relevance score, higher is more similar
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = VectorRecord::new("a", "hello", vec![1.0, 0.0, 0.0])
            .add_metadata("source", "unit")
            .with_description("greeting")
            .as_reference("wiki");

        assert_eq!(record.dimension(), 3);
        assert_eq!(record.metadata.get("source").map(String::as_str), Some("unit"));
        assert_eq!(record.description.as_deref(), Some("greeting"));
        assert_eq!(record.external_source_name.as_deref(), Some("wiki"));
        assert!(record.is_reference);
    }

    #[test]
    fn test_same_content_ignores_timestamp() {
        let a = VectorRecord::new("a", "hello", vec![1.0]);
        let mut b = a.clone();
        b.timestamp = a.timestamp + chrono::Duration::seconds(10);
        assert!(a.same_content(&b));

        b.text = "changed".into();
        assert!(!a.same_content(&b));
    }
}
