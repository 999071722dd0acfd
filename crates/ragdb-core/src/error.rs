use std::time::Duration;
use thiserror::Error;

use crate::types::GenerationStatus;

#[derive(Debug, Error)]
pub enum Error {
    /// Reserved; chunking is total over valid strings.
    #[error("Chunking failed: {0}")]
    Chunking(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model mismatch: store uses '{expected}', batch uses '{actual}'")]
    EmbeddingModelMismatch { expected: String, actual: String },

    #[error("Embedding service failed: {0}")]
    EmbeddingService(String),

    #[error("Embedding service returned {actual} vectors for {expected} inputs")]
    EmbeddingCountMismatch { expected: usize, actual: usize },

    #[error("Query vector has dimension {actual}, index has {expected}")]
    QueryDimensionMismatch { expected: usize, actual: usize },

    #[error("top_k must be a positive integer")]
    InvalidTopK,

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the generation client. These never escape the orchestrator; they
/// are folded into a diagnostic answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation service returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("could not reach generation service: {0}")]
    Transport(String),

    #[error("invalid response from generation service: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    pub fn status(&self) -> GenerationStatus {
        match self {
            Self::Timeout(_) => GenerationStatus::Timeout,
            Self::Status { code, .. } => GenerationStatus::Http(*code),
            Self::Transport(_) => GenerationStatus::Transport,
            Self::InvalidResponse(_) => GenerationStatus::InvalidResponse,
        }
    }
}
