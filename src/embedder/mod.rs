//! Embedding collaborators.

use anyhow::Result;

use crate::record::Embedding;

pub mod openai;

pub use openai::OpenAiEmbedder;

/// Turns a document's full text into a vector.
///
/// Implementations report failures as-is; the ingest loop never retries them.
pub trait Embedder {
    /// Embeds a single text.
    fn embed(&self, text: &str) -> Result<Embedding>;
}

impl<T: Embedder + ?Sized> Embedder for &T {
    fn embed(&self, text: &str) -> Result<Embedding> {
        (**self).embed(text)
    }
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn embed(&self, text: &str) -> Result<Embedding> {
        (**self).embed(text)
    }
}
