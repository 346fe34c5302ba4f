use clap::Parser;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use docindex_cli::{parse_filter, provider, render_highlights, Article};
use docindex_core::config::Config;
use docindex_core::{Index, SearchRequest};

/// Search an article index, or fetch articles by id.
#[derive(Parser, Debug)]
#[command(name = "docindex-search", version, about)]
struct Args {
    /// Free-text query; may be empty when filters are given
    #[arg(default_value = "")]
    query: String,

    /// Filter as field=value, field>value, field>=value, field<value or field<=value
    #[arg(short, long = "filter")]
    filters: Vec<String>,

    #[arg(long, default_value_t = 0)]
    skip: i64,

    #[arg(long)]
    take: Option<i64>,

    /// Drop hits scoring below this
    #[arg(long)]
    min_score: Option<Decimal>,

    /// Show matched terms in [brackets]
    #[arg(long)]
    highlight: bool,

    /// Fetch these ids instead of searching
    #[arg(long = "id")]
    ids: Vec<String>,

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
    let config = Config::load()?;
    let mut engine = config.engine()?;
    if let Some(url) = args.url {
        engine.url = url;
    }

    let provider = provider(engine);
    let index = match args.index {
        Some(name) => Index::<Article>::with_name(name, provider)?,
        None => Index::<Article>::new(provider)?,
    };
    let read = index.read_operations();
    let cancel = CancellationToken::new();

    if !args.ids.is_empty() {
        let articles = read.get_many(args.ids, &cancel).await?;
        for article in &articles {
            println!("{}", serde_json::to_string_pretty(article)?);
        }
        println!("{} of the requested articles found", articles.len());
        return Ok(());
    }

    let mut request = SearchRequest::new(args.query).skip(args.skip).highlight(args.highlight);
    if let Some(take) = args.take {
        request = request.take(take);
    }
    if let Some(min) = args.min_score {
        request = request.minimum_score(min);
    }
    for raw in &args.filters {
        request = request.filter(parse_filter(raw)?);
    }

    let response = read.search(request, &cancel).await?;
    println!("{} hits (max score {})", response.total_hits, response.maximum_score.map(|s| s.to_string()).unwrap_or_else(|| "-".into()));
    for hit in &response.hits {
        let score = hit.score.map(|s| s.round_dp(4).to_string()).unwrap_or_default();
        let Some(article) = &hit.item else {
            println!("  {} {score} (no source)", hit.id);
            continue;
        };
        let title = match hit.highlights.get("title") {
            Some(offsets) => render_highlights(&article.title, offsets),
            None => article.title.clone(),
        };
        println!("  {} {score} {title}", hit.id);
        if let Some(offsets) = hit.highlights.get("body") {
            println!("      {}", render_highlights(&article.body, offsets));
        }
    }
    Ok(())
}
