//! ragdb-rag
//!
//! Ties the pieces together: corpus indexing into an `IndexStore`, and
//! retrieval-augmented answering against a loaded index with an HTTP
//! generation backend.

pub mod indexer;
pub mod ollama;
pub mod orchestrator;

pub use indexer::{CorpusReport, DocumentFailure, DocumentReport, Indexer};
pub use ollama::OllamaGenerator;
pub use orchestrator::{answer, assemble_context, build_prompt, RagEngine, GENERATION_FAILED_MARKER};
