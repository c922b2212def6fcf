//! Error taxonomy for ingest batches.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a batch.
///
/// Missing or mistyped item fields never show up here: the normalizer resolves them to
/// defaults. Only unreadable input and collaborator failures are fatal.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The input file could not be read.
    #[error("failed to read input {path:?}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The input is not valid JSON.
    #[error("input is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The input parsed but is neither `{"items": [...]}` nor a bare array.
    #[error("unsupported input shape: expected an object with an `items` array or a bare array, found {found}")]
    UnsupportedShape {
        /// Short description of the top-level value that was found.
        found: &'static str,
    },

    /// The embedding collaborator failed; earlier documents remain stored.
    #[error("embedding failed after {processed} stored document(s): {source:#}")]
    Embedding {
        /// Documents inserted before the failure.
        processed: usize,
        /// Error reported by the embedder.
        #[source]
        source: anyhow::Error,
    },

    /// The store collaborator rejected an insert; earlier documents remain stored.
    #[error("store insert failed after {processed} stored document(s): {source:#}")]
    Store {
        /// Documents inserted before the failure.
        processed: usize,
        /// Error reported by the store.
        #[source]
        source: anyhow::Error,
    },
}

impl IngestError {
    /// Number of documents persisted before the batch stopped.
    ///
    /// Errors raised before the loop starts report zero.
    pub fn processed(&self) -> usize {
        match self {
            Self::Embedding { processed, .. } | Self::Store { processed, .. } => *processed,
            Self::Io { .. } | Self::MalformedJson(_) | Self::UnsupportedShape { .. } => 0,
        }
    }
}
