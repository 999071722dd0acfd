use std::time::Duration;

use crate::error::{Error, GenerationError, Result};
use crate::types::{ChunkRef, IndexEntry, IndexStats, LoadedIndex};

/// Text → fixed-dimension vector. Equal input must give equal output.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model; stored with every record.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    /// Maximum input length in model tokens; longer input is truncated.
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Call `embed_batch` and hold the provider to its contract: one vector per
/// input, each of `dim()` length.
pub fn embed_checked(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let vectors = embedder.embed_batch(texts)?;
    if vectors.len() != texts.len() {
        return Err(Error::EmbeddingCountMismatch { expected: texts.len(), actual: vectors.len() });
    }
    if let Some(v) = vectors.iter().find(|v| v.len() != embedder.dim()) {
        return Err(Error::EmbeddingDimensionMismatch { expected: embedder.dim(), actual: v.len() });
    }
    Ok(vectors)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    pub model_id: String,
    pub timeout: Duration,
}

/// Prompt → generated text.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> std::result::Result<String, GenerationError>;
}

impl<F> Generator for F
where
    F: Fn(&str, &GenerateOptions) -> std::result::Result<String, GenerationError> + Send + Sync,
{
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> std::result::Result<String, GenerationError> {
        self(prompt, options)
    }
}

/// Persisted mapping chunk → embedding + metadata.
///
/// Single writer: `append` takes `&mut self`. A batch is all-or-nothing.
pub trait IndexStore {
    fn append(&mut self, entries: &[IndexEntry]) -> Result<usize>;
    fn load_all(&self) -> Result<LoadedIndex>;
    fn get(&self, chunk_ref: &ChunkRef) -> Result<Option<IndexEntry>>;
    fn stats(&self) -> Result<IndexStats>;
}
