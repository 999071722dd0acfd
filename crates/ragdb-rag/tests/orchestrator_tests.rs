use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use ragdb_core::traits::{Embedder, GenerateOptions, Generator};
use ragdb_core::types::{Chunk, GenerationStatus, IndexEntry, LoadedIndex};
use ragdb_core::{Error, GenerationError, Result};
use ragdb_embed::FakeEmbedder;
use ragdb_rag::{answer, assemble_context, build_prompt, RagEngine, GENERATION_FAILED_MARKER};

/// Returns fixed vectors for known texts.
struct TableEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dim: usize,
}

impl Embedder for TableEmbedder {
    fn model_id(&self) -> &str { "table" }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { 512 }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| self.vectors.get(t).cloned().ok_or_else(|| Error::EmbeddingService(format!("unknown text {t:?}"))))
            .collect()
    }
}

struct BrokenEmbedder { vectors_returned: usize }

impl Embedder for BrokenEmbedder {
    fn model_id(&self) -> &str { "broken" }
    fn dim(&self) -> usize { 3 }
    fn max_len(&self) -> usize { 512 }
    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.vectors_returned == 0 {
            return Err(Error::EmbeddingService("connection refused".into()));
        }
        Ok(vec![vec![1.0, 0.0, 0.0]; self.vectors_returned])
    }
}

fn three_chunk_index() -> (LoadedIndex, TableEmbedder) {
    let vectors = [vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
    let texts = ["The mind is calm", "Breathe deeply and relax", "Let thoughts pass"];
    let entries: Vec<IndexEntry> = texts
        .iter()
        .zip(vectors.iter())
        .enumerate()
        .map(|(i, (t, v))| IndexEntry::new(Chunk::new("meditation", i, *t), v.clone(), "table"))
        .collect();
    let mut table: HashMap<String, Vec<f32>> = HashMap::new();
    table.insert("how do I relax?".into(), vectors[1].clone());
    table.insert("what about thoughts?".into(), vec![0.0, 0.6, 0.8]);
    (LoadedIndex::from_entries(entries), TableEmbedder { vectors: table, dim: 3 })
}

fn options() -> GenerateOptions {
    GenerateOptions { model_id: "mistral".into(), timeout: Duration::from_secs(5) }
}

fn echo_generator(prompt: &str, _options: &GenerateOptions) -> std::result::Result<String, GenerationError> {
    Ok(format!("answered {} chars", prompt.len()))
}

#[test]
fn query_with_a_stored_vector_returns_that_chunk_first() -> Result<()> {
    let (index, embedder) = three_chunk_index();
    let response = answer("how do I relax?", &index, 1, &embedder, &echo_generator, &options())?;

    assert_eq!(response.retrieved.len(), 1);
    let top = &response.retrieved[0];
    assert_eq!(top.chunk.ordinal, 1);
    assert_eq!(top.rank, 1);
    assert!((top.score - 1.0).abs() < 1e-6);
    assert_eq!(response.context_text, "Breathe deeply and relax");
    assert_eq!(response.raw_status, GenerationStatus::Success);
    assert!(response.answer_text.starts_with("answered"));
    Ok(())
}

#[test]
fn context_follows_rank_order_and_prompt_orders_context_before_query() -> Result<()> {
    let (index, embedder) = three_chunk_index();
    let seen = Mutex::new(Vec::new());
    let recording = |prompt: &str, options: &GenerateOptions| -> std::result::Result<String, GenerationError> {
        seen.lock().map_err(|e| GenerationError::Transport(e.to_string()))?.push((prompt.to_string(), options.clone()));
        Ok("ok".into())
    };
    let response = answer("what about thoughts?", &index, 2, &embedder, &recording, &options())?;

    let ordinals: Vec<usize> = response.retrieved.iter().map(|r| r.chunk.ordinal).collect();
    assert_eq!(ordinals, vec![2, 1]);
    assert_eq!(response.context_text, "Let thoughts pass\n\nBreathe deeply and relax");

    let calls = seen.into_inner().map_err(|e| Error::Store(e.to_string()))?;
    assert_eq!(calls.len(), 1);
    let (prompt, sent_options) = &calls[0];
    assert_eq!(prompt, &build_prompt("what about thoughts?", &response.context_text));
    let context_at = prompt.find("Let thoughts pass").expect("context in prompt");
    let query_at = prompt.find("what about thoughts?").expect("query in prompt");
    assert!(context_at < query_at);
    assert_eq!(sent_options, &options());
    Ok(())
}

#[test]
fn generation_timeout_yields_diagnostic_answer_with_context() -> Result<()> {
    let (index, embedder) = three_chunk_index();
    let timing_out = |_prompt: &str, options: &GenerateOptions| -> std::result::Result<String, GenerationError> {
        Err(GenerationError::Timeout(options.timeout))
    };
    let response = answer("how do I relax?", &index, 3, &embedder, &timing_out, &options())?;

    assert!(response.answer_text.starts_with(GENERATION_FAILED_MARKER));
    assert!(response.answer_text.contains("timed out"));
    assert_eq!(response.raw_status, GenerationStatus::Timeout);
    assert_eq!(response.retrieved.len(), 3);
    assert!(!response.context_text.is_empty());
    Ok(())
}

#[test]
fn http_failure_is_reported_with_status() -> Result<()> {
    let (index, embedder) = three_chunk_index();
    let failing = |_prompt: &str, _options: &GenerateOptions| -> std::result::Result<String, GenerationError> {
        Err(GenerationError::Status { code: 503, body: "model loading".into() })
    };
    let response = answer("how do I relax?", &index, 1, &embedder, &failing, &options())?;
    assert_eq!(response.raw_status, GenerationStatus::Http(503));
    assert!(response.answer_text.contains("503"));
    assert_eq!(response.retrieved.len(), 1);
    Ok(())
}

#[test]
fn embedding_failure_is_fatal() {
    let (index, _) = three_chunk_index();
    let err = answer("anything", &index, 1, &BrokenEmbedder { vectors_returned: 0 }, &echo_generator, &options()).unwrap_err();
    assert!(matches!(err, Error::EmbeddingService(_)));

    let err = answer("anything", &index, 1, &BrokenEmbedder { vectors_returned: 2 }, &echo_generator, &options()).unwrap_err();
    assert!(matches!(err, Error::EmbeddingCountMismatch { expected: 1, actual: 2 }));
}

#[test]
fn retrieval_errors_surface() {
    let (index, embedder) = three_chunk_index();
    let err = answer("how do I relax?", &index, 0, &embedder, &echo_generator, &options()).unwrap_err();
    assert!(matches!(err, Error::InvalidTopK));

    let wide = FakeEmbedder::new(8);
    let err = answer("how do I relax?", &index, 1, &wide, &echo_generator, &options()).unwrap_err();
    assert!(matches!(err, Error::QueryDimensionMismatch { expected: 3, actual: 8 }));
}

#[test]
fn empty_index_still_calls_generator() -> Result<()> {
    let embedder = FakeEmbedder::new(16);
    let response = answer("anything at all", &LoadedIndex::empty(), 3, &embedder, &echo_generator, &options())?;
    assert!(response.retrieved.is_empty());
    assert_eq!(response.context_text, "");
    assert_eq!(response.raw_status, GenerationStatus::Success);
    Ok(())
}

#[test]
fn engine_answers_with_configured_top_k() -> Result<()> {
    let embedder = FakeEmbedder::new(64);
    let texts = ["Right view comes first", "Right intention follows", "Right speech abstains from lies"];
    let vectors = embedder.embed_batch(&texts.iter().map(|t| t.to_string()).collect::<Vec<_>>())?;
    let entries = texts
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (t, v))| IndexEntry::new(Chunk::new("path", i, *t), v, embedder.model_id()));
    let index = LoadedIndex::from_entries(entries);

    let generator: Box<dyn Generator> = Box::new(echo_generator);
    let engine = RagEngine::new(index, Box::new(embedder), generator, options(), 2);
    let response = engine.ask("Right intention follows")?;
    assert_eq!(response.retrieved.len(), 2);
    assert_eq!(response.retrieved[0].chunk.text, "Right intention follows");
    assert!((response.retrieved[0].score - 1.0).abs() < 1e-5);

    let response = engine.ask_with_top_k("Right intention follows", 10)?;
    assert_eq!(response.retrieved.len(), 3);
    Ok(())
}

#[test]
fn assemble_context_of_nothing_is_empty() {
    assert_eq!(assemble_context(&[]), "");
}
