//! Rows written to the document store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::normalizer::NormalizedDocument;

/// Model embedding vector, passed through to storage untouched.
pub type Embedding = Vec<f32>;

/// Write-once row inserted into the store; serializes to the exact insert body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Full text that was embedded.
    pub content: String,
    /// Embedding of `content`.
    pub embedding: Embedding,
    /// Per-type metadata fields.
    pub metadata: Map<String, Value>,
}

impl StoredRecord {
    /// Pairs a normalized document with its embedding.
    pub fn new(document: NormalizedDocument, embedding: Embedding) -> Self {
        Self {
            content: document.full_text,
            embedding,
            metadata: document.metadata,
        }
    }
}
