//! Sequential normalize → embed → insert loop.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::detector::{Batch, SourceType};
use crate::embedder::Embedder;
use crate::error::IngestError;
use crate::normalizer::{NormalizedDocument, Normalizer};
use crate::record::StoredRecord;
use crate::store::DocumentStore;

/// Caller choices for one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Skips detection when set.
    pub source_type: Option<SourceType>,
    /// Collection label; generated from the type and start time when unset or blank.
    pub collection: Option<String>,
}

/// Outcome of a completed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Collection label used for the batch.
    pub collection: String,
    /// Caller-supplied or detected type; `None` for unclassified bare arrays.
    pub source_type: Option<SourceType>,
    /// Documents embedded and inserted.
    pub documents: usize,
}

impl BatchReport {
    /// Human-readable type label (`general` when unclassified).
    pub fn source_label(&self) -> &'static str {
        crate::detector::collection_tag(self.source_type)
    }
}

/// Normalized documents for a batch, produced without touching any collaborator.
#[derive(Debug, Clone)]
pub struct Preview {
    /// Caller-supplied or detected type.
    pub source_type: Option<SourceType>,
    /// One document per input item, in order.
    pub documents: Vec<NormalizedDocument>,
}

/// Builds the default collection label, e.g. `blog_20240501_093000`.
pub fn collection_label(tag: &str, started_at: DateTime<Local>) -> String {
    format!("{}_{}", tag, started_at.format("%Y%m%d_%H%M%S"))
}

/// Parses and normalizes `input` without embedding or storing anything.
pub fn preview(input: &str, source_type: Option<SourceType>) -> Result<Preview, IngestError> {
    let batch = Batch::parse(input, source_type)?;
    let documents = Normalizer::for_batch(&batch).normalize_all(&batch.items);
    Ok(Preview {
        source_type: batch.source,
        documents,
    })
}

type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Drives batches through an embedder and a store, one item at a time.
///
/// The first collaborator failure aborts the batch. Documents inserted before it stay
/// inserted and the error carries how many there were.
pub struct Ingestor<E, S> {
    embedder: E,
    store: S,
    clock: Clock,
}

impl<E, S> Ingestor<E, S>
where
    E: Embedder,
    S: DocumentStore,
{
    /// Wires the collaborators together.
    pub fn new(embedder: E, store: S) -> Self {
        Self {
            embedder,
            store,
            clock: Arc::new(Local::now),
        }
    }

    /// Replaces the clock used for collection labels and `collected_at`.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Local> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Borrows the store, e.g. to query its total count after a batch.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads and ingests a JSON file.
    pub fn run_file(
        &self,
        path: &Path,
        options: &BatchOptions,
    ) -> Result<BatchReport, IngestError> {
        let input = fs::read_to_string(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.run(&input, options)
    }

    /// Parses and ingests raw JSON text.
    pub fn run(&self, input: &str, options: &BatchOptions) -> Result<BatchReport, IngestError> {
        let batch = Batch::parse(input, options.source_type)?;
        self.run_batch(batch, options)
    }

    /// Ingests an already-classified batch.
    pub fn run_batch(
        &self,
        batch: Batch,
        options: &BatchOptions,
    ) -> Result<BatchReport, IngestError> {
        let started_at = (self.clock)();
        let collection = match options.collection.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => collection_label(batch.collection_tag(), started_at),
        };
        info!(
            collection = %collection,
            source = batch.collection_tag(),
            items = batch.items.len(),
            "starting batch"
        );

        let clock = Arc::clone(&self.clock);
        let normalizer = Normalizer::for_batch(&batch).with_clock(move || clock());
        let mut processed = 0usize;
        for (index, item) in batch.items.iter().enumerate() {
            let document = normalizer.normalize(item);
            let embedding = self
                .embedder
                .embed(&document.full_text)
                .map_err(|source| IngestError::Embedding { processed, source })?;
            let record = StoredRecord::new(document, embedding);
            self.store
                .insert(&record)
                .map_err(|source| IngestError::Store { processed, source })?;
            processed += 1;
            debug!(index, processed, "stored document");
        }

        info!(collection = %collection, documents = processed, "batch complete");
        Ok(BatchReport {
            collection,
            source_type: batch.source,
            documents: processed,
        })
    }
}
