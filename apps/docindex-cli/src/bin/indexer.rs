use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use docindex_cli::{provider, Article, JsonLinesPopulator};
use docindex_core::config::Config;
use docindex_core::Index;

/// Rebuild an article index from a JSON-lines file.
#[derive(Parser, Debug)]
#[command(name = "docindex-indexer", version, about)]
struct Args {
    /// One JSON article per line
    input: PathBuf,

    /// Index name (defaults to the document type name)
    #[arg(short, long)]
    index: Option<String>,

    /// Engine url, overriding `engine.url` from config
    #[arg(long, env = "DOCINDEX_ENGINE__URL")]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let mut engine = config.engine()?;
    if let Some(url) = args.url {
        engine.url = url;
    }
    println!("Engine: {}", engine.url);

    let provider = provider(engine);
    let populator = Arc::new(JsonLinesPopulator::new(&args.input));
    let index = match args.index {
        Some(name) => Index::<Article>::with_name(name, provider)?,
        None => Index::<Article>::new(provider)?,
    }
    .with_populator(populator);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    index.regenerate(&cancel).await?;
    let stats = index.stats(&cancel).await?;
    println!("Indexed {} documents into '{}' from {}", stats.document_count, index.name(), args.input.display());
    if let Some(bytes) = stats.size_in_bytes {
        println!("Index size: {} bytes", bytes);
    }
    Ok(())
}
