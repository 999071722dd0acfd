//! ragdb-vector
//!
//! Durable index store on LanceDB: one row per chunk with its embedding, read
//! back in insertion order for exhaustive retrieval. Also hosts the optional
//! per-source audit sidecar.

pub mod audit;
pub mod schema;
pub mod store;
mod table;

pub use audit::{AuditWriter, SourceMetadata};
pub use store::LanceIndexStore;
