//! Sentence-greedy chunking with word overlap.
//!
//! Text is whitespace-normalized, split into sentences on runs of `.`, `!` and
//! `?`, and sentences are accumulated until the next one would push the buffer
//! past `max_length` characters. Each new chunk is seeded with the last
//! `overlap_words` words of the chunk before it. A sentence that is longer than
//! `max_length` on its own is emitted whole.

use serde::{Deserialize, Serialize};

use crate::types::{Chunk, Document};

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters (soft for oversize sentences).
    pub max_length: usize,
    /// Words carried over from the tail of a chunk into the next one.
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_length: 512, overlap_words: 50 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self { Self { config } }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        chunk(&document.source_id, &document.text, self.config.max_length, self.config.overlap_words)
    }
}

/// Split `text` into ordered, overlapping chunks. Never fails; empty or
/// whitespace-only input gives an empty vector.
pub fn chunk(source_id: &str, text: &str, max_length: usize, overlap_words: usize) -> Vec<Chunk> {
    chunk_texts(text, max_length, overlap_words)
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| Chunk::new(source_id, ordinal, text))
        .collect()
}

/// Collapse every whitespace run to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sentence-like units of already normalized text, terminators removed.
pub fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(SENTENCE_TERMINATORS).map(str::trim).filter(|s| !s.is_empty())
}

fn chunk_texts(text: &str, max_length: usize, overlap_words: usize) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for sentence in split_sentences(&normalized) {
        let sentence_chars = sentence.chars().count();
        if buffer.is_empty() {
            buffer.push_str(sentence);
            buffer_chars = sentence_chars;
            continue;
        }
        if buffer_chars + 1 + sentence_chars > max_length {
            let seed = tail_words(&buffer, overlap_words);
            chunks.push(std::mem::take(&mut buffer));
            buffer_chars = seed.chars().count();
            buffer = seed;
            if !buffer.is_empty() {
                buffer.push(' ');
                buffer_chars += 1;
            }
        } else {
            buffer.push(' ');
            buffer_chars += 1;
        }
        buffer.push_str(sentence);
        buffer_chars += sentence_chars;
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }
    chunks
}

/// Last `n` words of `text`, or all of it when it has fewer.
fn tail_words(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let words: Vec<&str> = text.split(' ').collect();
    let start = words.len().saturating_sub(n);
    words[start..].join(" ")
}
