use std::{env, path::PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use ragdb_cli::{clear_dirs, flag_value, init_tracing, load_settings, open_store};
use ragdb_core::chunker::Chunker;
use ragdb_core::loader::DocumentLoader;
use ragdb_core::traits::{Embedder, IndexStore};
use ragdb_embed::get_default_embedder;
use ragdb_rag::Indexer;
use ragdb_vector::AuditWriter;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (config, settings) = load_settings()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut texts_dir = None;
    let mut limit: Option<usize> = None;
    let mut fresh = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => { limit = Some(flag_value(&args, i, "--limit")?); i += 1; }
            "--fresh" => fresh = true,
            a if !a.starts_with('-') => texts_dir = Some(PathBuf::from(a)),
            other => anyhow::bail!("unknown flag {other}; usage: ragdb-indexer [texts_dir] [--limit N] [--fresh]"),
        }
        i += 1;
    }
    let texts_dir = texts_dir.unwrap_or_else(|| config.path(&settings.data.texts_dir));

    println!("ragdb indexer\n=============");
    println!("Texts directory: {}", texts_dir.display());
    let loader = DocumentLoader::new();
    let documents = match limit {
        Some(n) => loader.load_directory_limited(&texts_dir, n)?,
        None => loader.load_directory(&texts_dir)?,
    };
    if documents.is_empty() {
        println!("No .txt files found, nothing to index.");
        return Ok(());
    }

    if fresh {
        let mut dirs = vec![config.path(&settings.data.index_dir)];
        dirs.extend(settings.data.audit_dir.as_ref().map(|d| config.path(d)));
        for dir in clear_dirs(&dirs)? {
            println!("Removed {}", dir.display());
        }
    }
    let mut store = open_store(&config, &settings)?;
    let embedder = get_default_embedder(&settings.embedding, config.base_dir())?;
    println!("Embedding model: {} (dim {})", embedder.model_id(), embedder.dim());

    let mut indexer = Indexer::new(Chunker::new(settings.chunking), embedder.as_ref(), &mut store, settings.embedding.batch_size);
    if let Some(dir) = &settings.data.audit_dir {
        indexer = indexer.with_audit(AuditWriter::new(config.path(dir)));
    }

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?
            .progress_chars("#>-"),
    );
    let report = indexer.index_corpus_with(&documents, |position, _| {
        pb.set_message(documents[position].source_id.clone());
        pb.inc(1);
    });
    pb.finish_with_message("done");

    println!("\nIndexed {} documents ({} chunks)", report.indexed.len(), report.total_chunks());
    if !report.skipped_empty.is_empty() {
        println!("Skipped {} empty documents", report.skipped_empty.len());
    }
    for failure in &report.failures {
        eprintln!("Failed {}: {}", failure.source_id, failure.error);
    }

    let stats = store.stats()?;
    println!("Index now holds {} chunks", stats.record_count);
    if let (Some(dim), Some(model)) = (stats.dimension, stats.model_id) {
        println!("Embedding space: {model}, dimension {dim}");
    }
    println!("\nTo ask a question, run: cargo run --bin ragdb-ask '<question>'");
    Ok(())
}
