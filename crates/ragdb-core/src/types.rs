//! Domain types shared by the chunker, the index stores, the retriever and the
//! generation orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text the chapter extractor writes for a page with no content.
pub const NO_CONTENT_PLACEHOLDER: &str = "[No <div class=\"chapter\"> found]";

/// A unit of source text as handed over by the raw text collaborator.
///
/// - `source_id`: stable, path-derived key (relative path without extension)
/// - `filename`: file name of the source, kept for the audit sidecar
/// - `text`: full extracted text; empty text yields zero chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source_id: String,
    pub filename: String,
    pub text: String,
}

impl Document {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        let source_id = source_id.into();
        Self { filename: source_id.clone(), source_id, text: text.into() }
    }

    /// False for blank text and for the extractor's no-content placeholder.
    pub fn has_content(&self) -> bool {
        let text = self.text.trim();
        !text.is_empty() && text != NO_CONTENT_PLACEHOLDER
    }
}

/// Identity of a chunk inside a corpus: `(source_id, ordinal)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkRef {
    pub source_id: String,
    pub ordinal: usize,
}

impl ChunkRef {
    pub fn new(source_id: impl Into<String>, ordinal: usize) -> Self {
        Self { source_id: source_id.into(), ordinal }
    }
}

impl fmt::Display for ChunkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_id, self.ordinal)
    }
}

/// A bounded-length passage of a document, the unit of retrieval.
///
/// `char_length` counts Unicode scalar values of `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub source_id: String,
    pub ordinal: usize,
    pub text: String,
    pub char_length: usize,
}

impl Chunk {
    pub fn new(source_id: impl Into<String>, ordinal: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let char_length = text.chars().count();
        Self { source_id: source_id.into(), ordinal, text, char_length }
    }

    pub fn chunk_ref(&self) -> ChunkRef {
        ChunkRef::new(self.source_id.clone(), self.ordinal)
    }
}

/// The vector half of an index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub chunk_ref: ChunkRef,
    pub vector: Vec<f32>,
    pub dimension: usize,
    pub model_id: String,
}

impl EmbeddingRecord {
    pub fn new(chunk_ref: ChunkRef, vector: Vec<f32>, model_id: impl Into<String>) -> Self {
        let dimension = vector.len();
        Self { chunk_ref, vector, dimension, model_id: model_id.into() }
    }

    pub fn space(&self) -> EmbeddingSpace {
        EmbeddingSpace { dimension: self.dimension, model_id: self.model_id.clone() }
    }
}

/// The embedding space a store is pinned to once it holds a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSpace {
    pub dimension: usize,
    pub model_id: String,
}

/// A chunk together with its embedding; the unit of `IndexStore::append`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub record: EmbeddingRecord,
}

impl IndexEntry {
    pub fn new(chunk: Chunk, vector: Vec<f32>, model_id: impl Into<String>) -> Self {
        let record = EmbeddingRecord::new(chunk.chunk_ref(), vector, model_id);
        Self { chunk, record }
    }
}

/// Per-position metadata of a loaded index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Insertion position inside the store (0-based).
    pub position: usize,
    pub dimension: usize,
    pub model_id: String,
}

/// An immutable, fully materialized snapshot of an index store.
///
/// `vectors`, `chunks` and `metadata` are parallel: position `i` of each refers
/// to the same record, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedIndex {
    vectors: Vec<Vec<f32>>,
    chunks: Vec<Chunk>,
    metadata: Vec<ChunkMeta>,
}

impl LoadedIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from entries given in insertion order.
    pub fn from_entries(entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let mut index = Self::default();
        for (position, entry) in entries.into_iter().enumerate() {
            index.metadata.push(ChunkMeta {
                position,
                dimension: entry.record.dimension,
                model_id: entry.record.model_id,
            });
            index.vectors.push(entry.record.vector);
            index.chunks.push(entry.chunk);
        }
        index
    }

    pub fn vectors(&self) -> &[Vec<f32>] { &self.vectors }
    pub fn chunks(&self) -> &[Chunk] { &self.chunks }
    pub fn metadata(&self) -> &[ChunkMeta] { &self.metadata }
    pub fn len(&self) -> usize { self.chunks.len() }
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    /// Dimension shared by every vector, `None` for an empty index.
    pub fn dimension(&self) -> Option<usize> {
        self.metadata.first().map(|m| m.dimension)
    }

    pub fn into_parts(self) -> (Vec<Vec<f32>>, Vec<Chunk>, Vec<ChunkMeta>) {
        (self.vectors, self.chunks, self.metadata)
    }
}

/// Summary returned by `IndexStore::stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub record_count: usize,
    pub dimension: Option<usize>,
    pub model_id: Option<String>,
}

/// One ranked hit of a query. `rank` is 1-based, `score` lies in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub score: f32,
    pub rank: usize,
}

/// Everything the orchestrator hands to the generation client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub query: String,
    pub context_text: String,
    pub prompt: String,
    pub retrieved: Vec<RetrievalResult>,
}

/// Outcome of the generation call as observed by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStatus {
    Success,
    Timeout,
    Http(u16),
    Transport,
    InvalidResponse,
}

impl GenerationStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Timeout => f.write_str("timeout"),
            Self::Http(code) => write!(f, "http {code}"),
            Self::Transport => f.write_str("transport error"),
            Self::InvalidResponse => f.write_str("invalid response"),
        }
    }
}

/// Structured answer of one query. On a failed generation `answer_text` holds a
/// diagnostic message and `raw_status` the failure kind; `retrieved` is always
/// what the retrieval step found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub query: String,
    pub context_text: String,
    pub retrieved: Vec<RetrievalResult>,
    pub answer_text: String,
    pub raw_status: GenerationStatus,
}
