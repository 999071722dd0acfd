use std::env;
use std::io::{self, BufRead, Write};

use ragdb_cli::{flag_value, init_tracing, load_settings, open_store, print_response};
use ragdb_core::traits::IndexStore;
use ragdb_embed::get_default_embedder;
use ragdb_rag::{OllamaGenerator, RagEngine};

const QUIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (config, settings) = load_settings()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut query_words = Vec::new();
    let mut top_k = settings.retrieval.top_k;
    let mut interactive = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--top-k" | "-k" => { top_k = flag_value(&args, i, "--top-k")?; i += 1; }
            "--interactive" | "-i" => interactive = true,
            a if !a.starts_with('-') => query_words.push(a.to_string()),
            other => anyhow::bail!("unknown flag {other}; usage: ragdb-ask [query] [--top-k N] [--interactive]"),
        }
        i += 1;
    }
    if top_k == 0 {
        anyhow::bail!("--top-k must be a positive integer");
    }

    let store = open_store(&config, &settings)?;
    let index = store.load_all()?;
    if index.is_empty() {
        anyhow::bail!("index is empty; run ragdb-indexer first");
    }
    println!("Loaded {} chunks", index.len());

    let embedder = get_default_embedder(&settings.embedding, config.base_dir())?;
    let generator = OllamaGenerator::new(&settings.generation.base_url)?;
    let engine = RagEngine::new(index, embedder, Box::new(generator), settings.generation.options(), top_k);

    if !query_words.is_empty() {
        let query = query_words.join(" ");
        println!("Query: {query}\n{}", "-".repeat(50));
        print_response(&engine.ask(&query)?);
        if !interactive {
            return Ok(());
        }
    }

    println!("\nInteractive mode. Type '{}' to stop.", QUIT_WORDS.join("', '"));
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nQuestion: ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let query = line?;
        let query = query.trim();
        if query.is_empty() {
            continue;
        }
        if QUIT_WORDS.contains(&query.to_lowercase().as_str()) {
            break;
        }
        match engine.ask(query) {
            Ok(response) => print_response(&response),
            Err(e) => eprintln!("Error: {e}"),
        }
    }
    Ok(())
}
