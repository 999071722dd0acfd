//! Exhaustive cosine-similarity retrieval over a loaded index.
//!
//! Every stored vector is scored against the query, so cost is linear in the
//! record count. That is fine up to `EXHAUSTIVE_SCAN_LIMIT` records; past that an
//! approximate structure should sit behind the same `retrieve` signature.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{LoadedIndex, RetrievalResult};

/// Design limit of the full scan.
pub const EXHAUSTIVE_SCAN_LIMIT: usize = 50_000;

/// `dot(a, b) / (|a| |b|)`, defined as 0 when either norm is zero, clamped to
/// `[-1, 1]`. Callers guarantee equal lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = l2_norm(a);
    similarity_with_norm(a, norm_a, b)
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn similarity_with_norm(query: &[f32], query_norm: f32, v: &[f32]) -> f32 {
    let norm_v = l2_norm(v);
    if query_norm == 0.0 || norm_v == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(v).map(|(x, y)| x * y).sum();
    let score = dot / (query_norm * norm_v);
    if score.is_finite() { score.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Rank every record of `index` against `query` and return the best `top_k`.
///
/// Ties keep insertion order. An empty index yields an empty result; `top_k`
/// larger than the index yields every record.
pub fn retrieve(query: &[f32], index: &LoadedIndex, top_k: usize) -> Result<Vec<RetrievalResult>> {
    if top_k == 0 {
        return Err(Error::InvalidTopK);
    }
    let Some(dimension) = index.dimension() else {
        return Ok(Vec::new());
    };
    if query.len() != dimension {
        return Err(Error::QueryDimensionMismatch { expected: dimension, actual: query.len() });
    }
    if index.len() > EXHAUSTIVE_SCAN_LIMIT {
        warn!(records = index.len(), limit = EXHAUSTIVE_SCAN_LIMIT, "full-scan retrieval past its design limit");
    }

    let query_norm = l2_norm(query);
    let mut scored: Vec<(usize, f32)> = index
        .vectors()
        .iter()
        .enumerate()
        .map(|(position, v)| (position, similarity_with_norm(query, query_norm, v)))
        .collect();
    // stable: equal scores stay in insertion order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);

    let chunks = index.chunks();
    let results: Vec<RetrievalResult> = scored
        .into_iter()
        .enumerate()
        .map(|(i, (position, score))| RetrievalResult { chunk: chunks[position].clone(), score, rank: i + 1 })
        .collect();
    debug!(records = index.len(), returned = results.len(), "retrieval done");
    Ok(results)
}
