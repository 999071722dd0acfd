//! Helpers shared by the `ragdb-*` binaries.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ragdb_core::config::{Config, Settings};
use ragdb_core::types::GenerationResponse;
use ragdb_vector::LanceIndexStore;
use tracing_subscriber::EnvFilter;

pub const PREVIEW_CHARS: usize = 200;

/// `RUST_LOG` wins; `info` otherwise.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

pub fn load_settings() -> Result<(Config, Settings)> {
    let config = Config::load().context("loading configuration")?;
    let settings = config.settings()?;
    Ok((config, settings))
}

pub fn open_store(config: &Config, settings: &Settings) -> Result<LanceIndexStore> {
    let index_dir = config.path(&settings.data.index_dir);
    LanceIndexStore::open_or_create(&index_dir, &settings.data.table)
        .with_context(|| format!("opening index at {}", index_dir.display()))
}

/// Remove each directory that exists; returns the ones removed.
pub fn clear_dirs(dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for dir in dirs.iter().filter(|d| d.exists()) {
        fs::remove_dir_all(dir).with_context(|| format!("removing {}", dir.display()))?;
        removed.push(dir.clone());
    }
    Ok(removed)
}

/// Value following a `--flag`, parsed.
pub fn flag_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T> {
    args.get(i + 1)
        .and_then(|v| v.parse().ok())
        .with_context(|| format!("{flag} requires a value"))
}

/// First `max_chars` characters of `text`, with `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn print_response(response: &GenerationResponse) {
    println!("\nRetrieved {} relevant chunks:", response.retrieved.len());
    for hit in &response.retrieved {
        println!("\n{}. {} #{} (similarity: {:.3})", hit.rank, hit.chunk.source_id, hit.chunk.ordinal, hit.score);
        println!("   {}", preview(&hit.chunk.text, PREVIEW_CHARS));
    }
    println!("\n{}", "=".repeat(50));
    println!("Answer ({}):\n{}", response.raw_status, response.answer_text);
    println!("{}", "=".repeat(50));
}
