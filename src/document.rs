//! Caller-facing document model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary structured metadata attached to a document.
pub type Metadata = Map<String, Value>;

/// A text document stored in, or retrieved from, the vector index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Point identifier. Optional on writes; always populated on reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Text that is embedded and returned verbatim.
    pub content: String,
    /// Caller-defined metadata, round-tripped through the index payload.
    #[serde(default)]
    pub metadata: Metadata,
    /// Similarity score reported by the index. Zero for scrolled documents.
    #[serde(default)]
    pub score: f32,
    /// Stored vector, present only when the index returned it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl Document {
    /// Create a document with the given content and no metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Attach metadata, replacing any existing map.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Insert a single metadata entry.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Request a specific point identifier for this document.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
