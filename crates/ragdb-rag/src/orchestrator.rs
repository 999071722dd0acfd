//! Query → embed → retrieve → prompt → generate.

use tracing::{debug, warn};

use ragdb_core::error::{Error, Result};
use ragdb_core::retriever::retrieve;
use ragdb_core::traits::{embed_checked, Embedder, GenerateOptions, Generator};
use ragdb_core::types::{GenerationRequest, GenerationResponse, GenerationStatus, LoadedIndex, RetrievalResult};

/// Prefix of `answer_text` when the generation call failed.
pub const GENERATION_FAILED_MARKER: &str = "[generation failed]";

/// Retrieved chunk texts in rank order, separated by a blank line.
pub fn assemble_context(retrieved: &[RetrievalResult]) -> String {
    retrieved.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

pub fn build_prompt(query: &str, context_text: &str) -> String {
    format!(
        "Based on the following context, please answer the question.\n\n\
         Context:\n{context_text}\n\n\
         Question: {query}\n\n\
         Answer using only the context provided above:"
    )
}

pub fn build_request(query: &str, retrieved: Vec<RetrievalResult>) -> GenerationRequest {
    let context_text = assemble_context(&retrieved);
    let prompt = build_prompt(query, &context_text);
    GenerationRequest { query: query.to_string(), context_text, prompt, retrieved }
}

/// Embed `query` as a single-item batch.
pub fn embed_query(embedder: &dyn Embedder, query: &str) -> Result<Vec<f32>> {
    let mut vectors = embed_checked(embedder, &[query.to_string()])?;
    vectors.pop().ok_or(Error::EmbeddingCountMismatch { expected: 1, actual: 0 })
}

/// Answer one query against a loaded index.
///
/// Embedding and retrieval errors are returned. Generation errors are not: they
/// become a diagnostic `answer_text` starting with [`GENERATION_FAILED_MARKER`],
/// with `retrieved` and `context_text` still filled in.
pub fn answer(
    query: &str,
    index: &LoadedIndex,
    top_k: usize,
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    options: &GenerateOptions,
) -> Result<GenerationResponse> {
    if let Some(meta) = index.metadata().first() {
        if meta.model_id != embedder.model_id() {
            warn!(index_model = %meta.model_id, query_model = embedder.model_id(), "query embedder differs from index model");
        }
    }
    let query_vector = embed_query(embedder, query)?;
    let retrieved = retrieve(&query_vector, index, top_k)?;
    debug!(top_k, hits = retrieved.len(), "retrieved context");

    let request = build_request(query, retrieved);
    let (answer_text, raw_status) = match generator.generate(&request.prompt, options) {
        Ok(text) => (text, GenerationStatus::Success),
        Err(e) => {
            warn!(error = %e, model = %options.model_id, "generation failed");
            (format!("{GENERATION_FAILED_MARKER} {e}"), e.status())
        }
    };
    Ok(GenerationResponse {
        query: request.query,
        context_text: request.context_text,
        retrieved: request.retrieved,
        answer_text,
        raw_status,
    })
}

/// A loaded index bundled with the services needed to answer queries.
pub struct RagEngine {
    index: LoadedIndex,
    embedder: Box<dyn Embedder>,
    generator: Box<dyn Generator>,
    options: GenerateOptions,
    top_k: usize,
}

impl RagEngine {
    pub fn new(
        index: LoadedIndex,
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
        options: GenerateOptions,
        top_k: usize,
    ) -> Self {
        Self { index, embedder, generator, options, top_k }
    }

    pub fn index(&self) -> &LoadedIndex { &self.index }
    pub fn top_k(&self) -> usize { self.top_k }

    pub fn ask(&self, query: &str) -> Result<GenerationResponse> {
        self.ask_with_top_k(query, self.top_k)
    }

    pub fn ask_with_top_k(&self, query: &str, top_k: usize) -> Result<GenerationResponse> {
        answer(query, &self.index, top_k, self.embedder.as_ref(), self.generator.as_ref(), &self.options)
    }
}
