//! Elasticsearch response bodies and their conversion into engine payloads.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use docindex_core::types::IndexStats;
use docindex_core::wire::{BulkItemOutcome, BulkResponse, EngineGetHit, EngineGetResponse, EngineHit, EngineSearchResponse};
use docindex_core::{Error, Result};

#[derive(Debug, Deserialize)]
struct SearchResult {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: Option<Total>,
    max_score: Option<f64>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// `{"value": n, "relation": ..}` on 7.x and later, a bare number before.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Object { value: u64 },
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: Option<Value>,
    #[serde(default)]
    highlight: BTreeMap<String, Vec<String>>,
}

pub fn parse_search(body: &str) -> Result<EngineSearchResponse> {
    let result: SearchResult = serde_json::from_str(body)?;
    let hits = result.hits;
    let total = match hits.total {
        Some(Total::Object { value }) | Some(Total::Count(value)) => value,
        None => hits.hits.len() as u64,
    };
    Ok(EngineSearchResponse {
        total,
        max_score: hits.max_score,
        hits: hits
            .hits
            .into_iter()
            .map(|h| EngineHit { index: h.index, id: h.id, score: h.score, source: h.source, highlight: h.highlight })
            .collect(),
    })
}

#[derive(Debug, Deserialize)]
struct MgetResult {
    docs: Vec<RawGetDoc>,
}

#[derive(Debug, Deserialize)]
struct RawGetDoc {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Value>,
    error: Option<Value>,
}

/// A doc that errored (e.g. its index is missing) fails the whole lookup.
pub fn parse_mget(body: &str) -> Result<EngineGetResponse> {
    let result: MgetResult = serde_json::from_str(body)?;
    let mut docs = Vec::with_capacity(result.docs.len());
    for d in result.docs {
        if let Some(error) = d.error {
            return Err(doc_error(&d.index, &error));
        }
        docs.push(EngineGetHit { index: d.index, id: d.id, found: d.found, source: d.source });
    }
    Ok(EngineGetResponse { docs })
}

fn doc_error(index: &str, error: &Value) -> Error {
    let reason = reason_of(error).unwrap_or_else(|| format!("lookup in [{index}] failed: {error}"));
    match error["type"].as_str() {
        Some("index_not_found_exception") => Error::engine_status(404, reason),
        _ => Error::engine_response(reason),
    }
}

#[derive(Debug, Deserialize)]
struct BulkResult {
    #[serde(default)]
    items: Vec<HashMap<String, BulkAction>>,
}

#[derive(Debug, Deserialize)]
struct BulkAction {
    #[serde(rename = "_id")]
    id: String,
    error: Option<Value>,
}

pub fn parse_bulk(body: &str) -> Result<BulkResponse> {
    let result: BulkResult = serde_json::from_str(body)?;
    let items = result
        .items
        .into_iter()
        .flat_map(HashMap::into_values)
        .map(|a| BulkItemOutcome { id: a.id, error: a.error })
        .collect();
    Ok(BulkResponse { items })
}

#[derive(Debug, Deserialize)]
struct StatsResult {
    #[serde(rename = "_all")]
    all: StatsGroup,
}

#[derive(Debug, Deserialize)]
struct StatsGroup {
    total: StatsTotals,
}

#[derive(Debug, Deserialize)]
struct StatsTotals {
    docs: DocsStats,
    store: Option<StoreStats>,
}

#[derive(Debug, Deserialize)]
struct DocsStats {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct StoreStats {
    size_in_bytes: u64,
}

pub fn parse_stats(body: &str) -> Result<IndexStats> {
    let result: StatsResult = serde_json::from_str(body)?;
    let totals = result.all.total;
    Ok(IndexStats { document_count: totals.docs.count, size_in_bytes: totals.store.map(|s| s.size_in_bytes) })
}

/// The most specific reason in an error body, falling back to the raw text.
pub fn error_reason(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    reason_of(&value["error"]).unwrap_or_else(|| body.trim().to_string())
}

fn reason_of(error: &Value) -> Option<String> {
    error["root_cause"][0]["reason"]
        .as_str()
        .or_else(|| error["reason"].as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
}
