//! Human-readable sidecar of what was indexed per source.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragdb_core::types::Chunk;
use ragdb_core::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub filename: String,
    pub source_id: String,
    pub original_text_length: usize,
    pub num_chunks: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_dimension: usize,
    pub model: String,
    pub chunk_lengths: Vec<usize>,
    pub indexed_at: DateTime<Utc>,
}

/// Writes `<root>/<source_id>.json` and `<root>/<source_id>/chunk_<n>.txt`.
#[derive(Debug, Clone)]
pub struct AuditWriter {
    root: PathBuf,
}

impl AuditWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path { &self.root }

    pub fn metadata_path(&self, source_id: &str) -> PathBuf {
        self.root.join(format!("{source_id}.json"))
    }

    pub fn chunk_dir(&self, source_id: &str) -> PathBuf {
        self.root.join(source_id)
    }

    pub fn write(&self, meta: &SourceMetadata, chunks: &[Chunk]) -> Result<()> {
        let meta_path = self.metadata_path(&meta.source_id);
        if let Some(parent) = meta_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&meta_path, serde_json::to_string_pretty(meta)?)?;

        let dir = self.chunk_dir(&meta.source_id);
        fs::create_dir_all(&dir)?;
        for chunk in chunks {
            fs::write(dir.join(format!("chunk_{}.txt", chunk.ordinal)), &chunk.text)?;
        }
        debug!(source = %meta.source_id, chunks = chunks.len(), path = %meta_path.display(), "wrote audit sidecar");
        Ok(())
    }

    pub fn read(&self, source_id: &str) -> Result<SourceMetadata> {
        let raw = fs::read_to_string(self.metadata_path(source_id))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
