use ragdb_cli::{init_tracing, load_settings, open_store};
use ragdb_core::traits::IndexStore;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (config, settings) = load_settings()?;
    let store = open_store(&config, &settings)?;
    let stats = store.stats()?;

    println!("ragdb status\n============");
    println!("Index:      {} (table '{}')", config.path(&settings.data.index_dir).display(), store.table_name());
    println!("Chunks:     {}", stats.record_count);
    match (stats.dimension, stats.model_id) {
        (Some(dim), Some(model)) => println!("Embeddings: {model}, dimension {dim}"),
        _ => println!("Embeddings: none yet"),
    }
    println!("Chunking:   max {} chars, {} words overlap", settings.chunking.max_length, settings.chunking.overlap_words);
    println!("Generation: {} at {}", settings.generation.model, settings.generation.base_url);
    Ok(())
}
