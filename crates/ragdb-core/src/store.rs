//! Batch validation shared by every `IndexStore`, plus an in-memory store.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::traits::IndexStore;
use crate::types::{ChunkRef, EmbeddingSpace, IndexEntry, IndexStats, LoadedIndex};

/// Check a batch before anything is written.
///
/// The batch must be internally consistent (each record points at its own chunk,
/// vectors have their declared length, one embedding space, no duplicate refs)
/// and agree with the space the store is already pinned to. Returns the space the
/// store is pinned to after the append.
pub fn validate_batch(established: Option<&EmbeddingSpace>, entries: &[IndexEntry]) -> Result<Option<EmbeddingSpace>> {
    let Some(first) = entries.first() else {
        return Ok(established.cloned());
    };
    let batch_space = first.record.space();
    if batch_space.dimension == 0 {
        return Err(Error::InvalidBatch(format!("{} has an empty vector", first.record.chunk_ref)));
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        let chunk_ref = entry.chunk.chunk_ref();
        if entry.record.chunk_ref != chunk_ref {
            return Err(Error::InvalidBatch(format!(
                "record for {} attached to chunk {}",
                entry.record.chunk_ref, chunk_ref
            )));
        }
        if entry.chunk.text.is_empty() {
            return Err(Error::InvalidBatch(format!("{chunk_ref} has empty text")));
        }
        if entry.record.vector.len() != entry.record.dimension {
            return Err(Error::EmbeddingDimensionMismatch {
                expected: entry.record.dimension,
                actual: entry.record.vector.len(),
            });
        }
        check_space(&batch_space, &entry.record.space())?;
        if !seen.insert(chunk_ref.clone()) {
            return Err(Error::InvalidBatch(format!("{chunk_ref} appears twice in one batch")));
        }
    }

    match established {
        Some(space) => {
            check_space(space, &batch_space)?;
            Ok(Some(space.clone()))
        }
        None => Ok(Some(batch_space)),
    }
}

fn check_space(expected: &EmbeddingSpace, actual: &EmbeddingSpace) -> Result<()> {
    if expected.dimension != actual.dimension {
        return Err(Error::EmbeddingDimensionMismatch { expected: expected.dimension, actual: actual.dimension });
    }
    if expected.model_id != actual.model_id {
        return Err(Error::EmbeddingModelMismatch {
            expected: expected.model_id.clone(),
            actual: actual.model_id.clone(),
        });
    }
    Ok(())
}

/// Non-durable store; used by tests and as a scratch index.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    entries: Vec<IndexEntry>,
    space: Option<EmbeddingSpace>,
}

impl MemoryIndexStore {
    pub fn new() -> Self { Self::default() }
}

impl IndexStore for MemoryIndexStore {
    fn append(&mut self, entries: &[IndexEntry]) -> Result<usize> {
        let space = validate_batch(self.space.as_ref(), entries)?;
        if let Some(dup) = entries.iter().find(|e| self.entries.iter().any(|s| s.chunk.chunk_ref() == e.chunk.chunk_ref())) {
            return Err(Error::InvalidBatch(format!("{} is already indexed", dup.chunk.chunk_ref())));
        }
        self.entries.extend_from_slice(entries);
        self.space = space;
        Ok(entries.len())
    }

    fn load_all(&self) -> Result<LoadedIndex> {
        Ok(LoadedIndex::from_entries(self.entries.iter().cloned()))
    }

    fn get(&self, chunk_ref: &ChunkRef) -> Result<Option<IndexEntry>> {
        Ok(self.entries.iter().find(|e| &e.record.chunk_ref == chunk_ref).cloned())
    }

    fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            record_count: self.entries.len(),
            dimension: self.space.as_ref().map(|s| s.dimension),
            model_id: self.space.as_ref().map(|s| s.model_id.clone()),
        })
    }
}
