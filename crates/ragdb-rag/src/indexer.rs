//! Document → chunks → embeddings → one store append per document.

use chrono::Utc;
use tracing::{debug, info, warn};

use ragdb_core::chunker::Chunker;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{embed_checked, Embedder, IndexStore};
use ragdb_core::types::{Document, IndexEntry};
use ragdb_vector::{AuditWriter, SourceMetadata};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub source_id: String,
    pub chunks: usize,
    pub chunk_lengths: Vec<usize>,
    /// False when the audit sidecar was requested but could not be written.
    pub audited: bool,
}

#[derive(Debug)]
pub struct DocumentFailure {
    pub source_id: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct CorpusReport {
    pub indexed: Vec<DocumentReport>,
    pub skipped_empty: Vec<String>,
    pub failures: Vec<DocumentFailure>,
}

impl CorpusReport {
    pub fn total_chunks(&self) -> usize {
        self.indexed.iter().map(|r| r.chunks).sum()
    }
}

pub struct Indexer<'a, S: IndexStore> {
    chunker: Chunker,
    embedder: &'a dyn Embedder,
    store: &'a mut S,
    batch_size: usize,
    audit: Option<AuditWriter>,
}

impl<'a, S: IndexStore> Indexer<'a, S> {
    pub fn new(chunker: Chunker, embedder: &'a dyn Embedder, store: &'a mut S, batch_size: usize) -> Self {
        Self { chunker, embedder, store, batch_size: batch_size.max(1), audit: None }
    }

    pub fn with_audit(mut self, audit: AuditWriter) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn store(&self) -> &S { self.store }

    /// Chunk, embed in `batch_size` slices and append the whole document as one
    /// batch. Nothing is written if any embedding call fails.
    pub fn index_document(&mut self, document: &Document) -> Result<DocumentReport> {
        if !document.has_content() {
            return Ok(DocumentReport { source_id: document.source_id.clone(), chunks: 0, chunk_lengths: Vec::new(), audited: false });
        }
        let chunks = self.chunker.chunk_document(document);
        let chunk_lengths: Vec<usize> = chunks.iter().map(|c| c.char_length).collect();
        if chunks.is_empty() {
            return Ok(DocumentReport { source_id: document.source_id.clone(), chunks: 0, chunk_lengths, audited: false });
        }

        let embedder = self.embedder;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(source = %document.source_id, batch = batch.len(), "embedding batch");
            vectors.extend(embed_checked(embedder, batch)?);
        }

        let model_id = embedder.model_id();
        let entries: Vec<IndexEntry> =
            chunks.iter().cloned().zip(vectors).map(|(chunk, vector)| IndexEntry::new(chunk, vector, model_id)).collect();
        self.store.append(&entries)?;
        info!(source = %document.source_id, chunks = entries.len(), "indexed document");

        let audited = match &self.audit {
            Some(audit) => {
                let config = self.chunker.config();
                let meta = SourceMetadata {
                    filename: document.filename.clone(),
                    source_id: document.source_id.clone(),
                    original_text_length: document.text.chars().count(),
                    num_chunks: chunks.len(),
                    chunk_size: config.max_length,
                    chunk_overlap: config.overlap_words,
                    embedding_dimension: embedder.dim(),
                    model: model_id.to_string(),
                    chunk_lengths: chunk_lengths.clone(),
                    indexed_at: Utc::now(),
                };
                match audit.write(&meta, &chunks) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(source = %document.source_id, error = %e, "could not write audit sidecar");
                        false
                    }
                }
            }
            None => false,
        };

        Ok(DocumentReport { source_id: document.source_id.clone(), chunks: chunks.len(), chunk_lengths, audited })
    }

    pub fn index_corpus(&mut self, documents: &[Document]) -> CorpusReport {
        self.index_corpus_with(documents, |_, _| {})
    }

    /// Index every document, continuing past failures. `on_document` runs after
    /// each document with its position and outcome.
    pub fn index_corpus_with<F>(&mut self, documents: &[Document], mut on_document: F) -> CorpusReport
    where
        F: FnMut(usize, &Result<DocumentReport>),
    {
        let mut report = CorpusReport::default();
        for (position, document) in documents.iter().enumerate() {
            let outcome = self.index_document(document);
            on_document(position, &outcome);
            match outcome {
                Ok(r) if r.chunks == 0 => {
                    debug!(source = %document.source_id, "empty document skipped");
                    report.skipped_empty.push(r.source_id);
                }
                Ok(r) => report.indexed.push(r),
                Err(error) => {
                    warn!(source = %document.source_id, error = %error, "document not indexed");
                    report.failures.push(DocumentFailure { source_id: document.source_id.clone(), error });
                }
            }
        }
        info!(
            indexed = report.indexed.len(),
            skipped = report.skipped_empty.len(),
            failed = report.failures.len(),
            chunks = report.total_chunks(),
            "corpus indexing finished"
        );
        report
    }
}
