//! ragdb-core
//!
//! Data model, error taxonomy, capability traits and the pure parts of the
//! pipeline: chunking, batch validation and exhaustive retrieval.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod retriever;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{Error, GenerationError, Result};
