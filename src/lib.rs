#![warn(missing_docs)]
//! Loads search API exports (blog, shopping, news) into a vector document store.

pub mod config;
pub mod detector;
pub mod embedder;
pub mod error;
pub mod html;
pub mod normalizer;
pub mod pipeline;
pub mod record;
pub mod store;

pub use config::IngestCli;
pub use detector::{detect, Batch, InputShape, SourceType};
pub use embedder::{Embedder, OpenAiEmbedder};
pub use error::IngestError;
pub use html::strip_tags;
pub use normalizer::{normalize, parse_price, NormalizedDocument, Normalizer};
pub use pipeline::{collection_label, preview, BatchOptions, BatchReport, Ingestor, Preview};
pub use record::{Embedding, StoredRecord};
pub use store::{DocumentStore, SupabaseStore, TableName};
