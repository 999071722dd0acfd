use std::sync::Mutex;

use ragdb_core::chunker::{Chunker, ChunkingConfig};
use ragdb_core::store::MemoryIndexStore;
use ragdb_core::traits::{Embedder, IndexStore};
use ragdb_core::types::{ChunkRef, Document};
use ragdb_core::{Error, Result};
use ragdb_embed::FakeEmbedder;
use ragdb_rag::Indexer;
use ragdb_vector::AuditWriter;

const SUTTA: &str = "Monks, there are these two extremes. They should not be followed by one who has gone forth. \
    Indulgence in sensual pleasures is low and vulgar. Devotion to self-mortification is painful. \
    Avoiding both extremes the middle way was realized. It gives rise to vision and knowledge.";

fn small_chunker() -> Chunker {
    Chunker::new(ChunkingConfig { max_length: 80, overlap_words: 3 })
}

/// Wraps the fake embedder, failing on texts that contain "poison" and
/// recording the size of every call.
struct Recording {
    inner: FakeEmbedder,
    calls: Mutex<Vec<usize>>,
}

impl Recording {
    fn new() -> Self { Self { inner: FakeEmbedder::new(32), calls: Mutex::new(Vec::new()) } }
    fn calls(&self) -> Vec<usize> { self.calls.lock().map(|c| c.clone()).unwrap_or_default() }
}

impl Embedder for Recording {
    fn model_id(&self) -> &str { self.inner.model_id() }
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Ok(mut calls) = self.calls.lock() { calls.push(texts.len()); }
        if texts.iter().any(|t| t.contains("poison")) {
            return Err(Error::EmbeddingService("provider rejected input".into()));
        }
        self.inner.embed_batch(texts)
    }
}

#[test]
fn document_is_appended_as_one_batch_in_chunk_order() -> Result<()> {
    let embedder = FakeEmbedder::new(32);
    let mut store = MemoryIndexStore::new();
    let mut indexer = Indexer::new(small_chunker(), &embedder, &mut store, 32);

    let report = indexer.index_document(&Document::new("sn56/11", SUTTA))?;
    assert!(report.chunks >= 3);
    assert_eq!(report.chunk_lengths.len(), report.chunks);
    assert!(!report.audited);

    let index = store.load_all()?;
    assert_eq!(index.len(), report.chunks);
    for (i, chunk) in index.chunks().iter().enumerate() {
        assert_eq!(chunk.ordinal, i);
        assert_eq!(chunk.source_id, "sn56/11");
    }
    assert_eq!(store.stats()?.model_id.as_deref(), Some("fake-xxhash-d32"));
    Ok(())
}

#[test]
fn embedding_calls_are_bounded_by_batch_size() -> Result<()> {
    let embedder = Recording::new();
    let mut store = MemoryIndexStore::new();
    let mut indexer = Indexer::new(small_chunker(), &embedder, &mut store, 2);

    let report = indexer.index_document(&Document::new("sn56/11", SUTTA))?;
    let calls = embedder.calls();
    assert!(calls.iter().all(|&n| n <= 2));
    assert_eq!(calls.iter().sum::<usize>(), report.chunks);
    assert_eq!(calls.len(), report.chunks.div_ceil(2));
    Ok(())
}

#[test]
fn corpus_indexing_continues_past_failures() -> Result<()> {
    let embedder = Recording::new();
    let mut store = MemoryIndexStore::new();
    let docs = vec![
        Document::new("a", "First document. It is fine."),
        Document::new("b", "This one carries poison. It must not land in the index."),
        Document::new("c", "   \n\t  "),
        Document::new("d", "Last document. Also fine."),
    ];
    let mut seen = Vec::new();
    let report = Indexer::new(small_chunker(), &embedder, &mut store, 8).index_corpus_with(&docs, |i, outcome| {
        seen.push((i, outcome.is_ok()));
    });

    let indexed: Vec<&str> = report.indexed.iter().map(|r| r.source_id.as_str()).collect();
    assert_eq!(indexed, vec!["a", "d"]);
    assert_eq!(report.skipped_empty, vec!["c".to_string()]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source_id, "b");
    assert!(matches!(report.failures[0].error, Error::EmbeddingService(_)));
    assert_eq!(seen, vec![(0, true), (1, false), (2, true), (3, true)]);

    assert!(store.get(&ChunkRef::new("b", 0))?.is_none());
    assert_eq!(store.stats()?.record_count, report.total_chunks());
    Ok(())
}

#[test]
fn reindexing_a_document_is_rejected() -> Result<()> {
    let embedder = FakeEmbedder::new(32);
    let mut store = MemoryIndexStore::new();
    let mut indexer = Indexer::new(small_chunker(), &embedder, &mut store, 32);
    let doc = Document::new("dup", "Only once. Never twice.");

    indexer.index_document(&doc)?;
    let report = indexer.index_corpus(std::slice::from_ref(&doc));
    assert!(report.indexed.is_empty());
    assert!(matches!(report.failures[0].error, Error::InvalidBatch(_)));
    assert_eq!(indexer.store().stats()?.record_count, 1);
    Ok(())
}

#[test]
fn embedder_with_another_dimension_is_refused_by_the_store() -> Result<()> {
    let mut store = MemoryIndexStore::new();
    let first = FakeEmbedder::new(32);
    Indexer::new(small_chunker(), &first, &mut store, 32).index_document(&Document::new("a", "Some text here."))?;

    let second = FakeEmbedder::new(16);
    let err = Indexer::new(small_chunker(), &second, &mut store, 32)
        .index_document(&Document::new("b", "Other text here."))
        .unwrap_err();
    assert!(matches!(err, Error::EmbeddingDimensionMismatch { expected: 32, actual: 16 }));
    assert_eq!(store.stats()?.record_count, 1);
    Ok(())
}

#[test]
fn audit_sidecar_is_written_per_document() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let audit = AuditWriter::new(tmp.path());
    let embedder = FakeEmbedder::new(32);
    let mut store = MemoryIndexStore::new();
    let mut doc = Document::new("mn/mn10", SUTTA);
    doc.filename = "mn10.txt".into();

    let report = Indexer::new(small_chunker(), &embedder, &mut store, 4).with_audit(audit.clone()).index_document(&doc)?;
    assert!(report.audited);

    let meta = audit.read("mn/mn10")?;
    assert_eq!(meta.filename, "mn10.txt");
    assert_eq!(meta.num_chunks, report.chunks);
    assert_eq!(meta.chunk_lengths, report.chunk_lengths);
    assert_eq!(meta.chunk_size, 80);
    assert_eq!(meta.chunk_overlap, 3);
    assert_eq!(meta.embedding_dimension, 32);
    assert_eq!(meta.original_text_length, SUTTA.chars().count());

    let first = std::fs::read_to_string(audit.chunk_dir("mn/mn10").join("chunk_0.txt"))?;
    assert_eq!(first, store.load_all()?.chunks()[0].text);
    Ok(())
}

#[test]
fn extractor_placeholder_is_skipped_as_empty() -> Result<()> {
    let embedder = Recording::new();
    let mut store = MemoryIndexStore::new();
    let docs = vec![
        Document::new("mn/mn1", "Thus have I heard. At one time the Buddha was staying near Savatthi."),
        Document::new("mn/mn99", "[No <div class=\"chapter\"> found]"),
        Document::new("mn/mn100", "\n[No <div class=\"chapter\"> found]\n"),
    ];
    let report = Indexer::new(small_chunker(), &embedder, &mut store, 8).index_corpus(&docs);

    let indexed: Vec<&str> = report.indexed.iter().map(|r| r.source_id.as_str()).collect();
    assert_eq!(indexed, vec!["mn/mn1"]);
    assert_eq!(report.skipped_empty, vec!["mn/mn99".to_string(), "mn/mn100".to_string()]);
    assert!(report.failures.is_empty());
    assert!(store.get(&ChunkRef::new("mn/mn99", 0))?.is_none());
    assert_eq!(embedder.calls().iter().sum::<usize>(), report.total_chunks());
    Ok(())
}
