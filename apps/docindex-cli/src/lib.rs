//! Shared pieces of the docindex binaries: the `Article` document, engine
//! selection from config and the JSON-lines populator.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use docindex_core::config::EngineConfig;
use docindex_core::mapping::{Document, IndexMapping};
use docindex_core::provider::LazyClient;
use docindex_core::traits::{ClientFactory, ClientProvider, EngineClient, Populator};
use docindex_core::{Error, Filter, FilterValue, HighlightOffset, Result, WriteOperations};
use docindex_elastic::ElasticClientFactory;
use docindex_tantivy::TantivyClientFactory;

const UPSERT_BATCH: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

impl Document for Article {
    fn mapping() -> Result<IndexMapping> {
        IndexMapping::builder()
            .key("id")
            .keyword("id")
            .strings(&["title", "body"], Some("stopwords"), &[])
            .keyword("category")
            .date("published")
            .build()
    }
}

/// The engine named by `engine.url`: http(s) urls reach Elasticsearch,
/// anything else is the embedded tantivy engine.
pub enum EngineFactory {
    Tantivy(TantivyClientFactory),
    Elastic(ElasticClientFactory),
}

impl EngineFactory {
    pub fn from_config(config: EngineConfig) -> Self {
        let url = config.url.trim().to_ascii_lowercase();
        if url.starts_with("http://") || url.starts_with("https://") {
            Self::Elastic(ElasticClientFactory::new(config))
        } else {
            Self::Tantivy(TantivyClientFactory::new(config))
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tantivy(_) => "tantivy",
            Self::Elastic(_) => "elasticsearch",
        }
    }
}

#[async_trait]
impl ClientFactory for EngineFactory {
    async fn create_client(&self) -> Result<Arc<dyn EngineClient>> {
        match self {
            Self::Tantivy(f) => f.create_client().await,
            Self::Elastic(f) => f.create_client().await,
        }
    }
}

/// A provider that connects on first use.
pub fn provider(config: EngineConfig) -> Arc<dyn ClientProvider> {
    Arc::new(LazyClient::new(EngineFactory::from_config(config)))
}

/// Fills an index from a file holding one JSON article per line.
pub struct JsonLinesPopulator {
    path: PathBuf,
}

impl JsonLinesPopulator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn read(&self) -> Result<Vec<Article>> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::validation(format!("reading {}: {e}", self.path.display())))?;
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| Error::validation(format!("{}:{}: {e}", self.path.display(), n + 1)))
            })
            .collect()
    }
}

#[async_trait]
impl Populator<Article> for JsonLinesPopulator {
    async fn populate(&self, writer: &WriteOperations<Article>, cancel: &CancellationToken) -> Result<()> {
        let articles = self.read()?;
        for batch in articles.chunks(UPSERT_BATCH) {
            writer.upsert(batch, cancel).await?;
        }
        tracing::info!(path = %self.path.display(), count = articles.len(), "populated from json lines");
        Ok(())
    }
}

/// Parse `field=value`, `field>value`, `field>=value`, `field<value` or
/// `field<=value`.
pub fn parse_filter(raw: &str) -> Result<Filter> {
    let (at, op) = raw
        .char_indices()
        .find(|(_, c)| matches!(c, '=' | '<' | '>'))
        .ok_or_else(|| Error::validation(format!("filter '{raw}' has no operator")))?;
    let field = raw[..at].trim();
    let rest = &raw[at + op.len_utf8()..];
    let (operation, value) = match (op, rest.strip_prefix('=')) {
        ('=', _) => ("", rest),
        ('<', Some(v)) => ("lte", v),
        ('<', None) => ("lt", rest),
        (_, Some(v)) => ("gte", v),
        (_, None) => ("gt", rest),
    };
    if field.is_empty() {
        return Err(Error::validation(format!("filter '{raw}' has no field")));
    }
    Ok(Filter::new(field, operation, filter_value(value.trim())))
}

fn filter_value(raw: &str) -> FilterValue {
    if let Ok(i) = raw.parse::<i64>() {
        return FilterValue::Integer(i);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return FilterValue::Timestamp(ts.with_timezone(&Utc));
    }
    match raw {
        "true" => FilterValue::Boolean(true),
        "false" => FilterValue::Boolean(false),
        _ => FilterValue::String(raw.to_string()),
    }
}

/// Bracket each highlighted span of `text`.
pub fn render_highlights(text: &str, offsets: &[HighlightOffset]) -> String {
    let mut out = String::with_capacity(text.len() + offsets.len() * 2);
    for (i, c) in text.chars().enumerate() {
        if offsets.iter().any(|o| o.offset == i && o.length > 0) {
            out.push('[');
        }
        out.push(c);
        if offsets.iter().any(|o| o.length > 0 && o.offset + o.length == i + 1) {
            out.push(']');
        }
    }
    out
}
