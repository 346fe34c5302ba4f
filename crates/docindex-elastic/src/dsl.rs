//! Request bodies in the Elasticsearch query DSL.

use serde_json::{json, Map, Value};

use docindex_core::mapping::{FieldKind, IndexMapping};
use docindex_core::query::{Clause, NativeQuery};
use docindex_core::wire::{BulkItem, GetTarget};
use docindex_core::Result;

pub fn search_body(query: &NativeQuery) -> Result<Value> {
    let mut body = Map::new();
    if let Some(from) = query.from {
        body.insert("from".into(), json!(from));
    }
    if let Some(size) = query.size {
        body.insert("size".into(), json!(size));
    }
    if let Some(min_score) = query.min_score {
        body.insert("min_score".into(), json!(min_score));
    }

    let bool_query = &query.query;
    let rendered = if bool_query.should.is_empty() && bool_query.filter.is_empty() {
        json!({ "match_all": {} })
    } else {
        let should = bool_query.should.iter().map(clause).collect::<Result<Vec<_>>>()?;
        let filter = bool_query.filter.iter().map(clause).collect::<Result<Vec<_>>>()?;
        json!({ "bool": { "should": should, "filter": filter } })
    };
    body.insert("query".into(), rendered);

    if let Some(highlight) = &query.highlight {
        // whole field, one fragment, same tag on both sides
        body.insert(
            "highlight".into(),
            json!({
                "pre_tags": [highlight.marker],
                "post_tags": [highlight.marker],
                "require_field_match": false,
                "fields": { "*": { "number_of_fragments": 0 } },
            }),
        );
    }
    Ok(Value::Object(body))
}

fn clause(clause: &Clause) -> Result<Value> {
    Ok(match clause {
        Clause::Match { field, query } => json!({ "match": { field: { "query": query } } }),
        Clause::QueryString { query } => json!({ "query_string": { "query": query } }),
        Clause::Term { field, value } => json!({ "term": { field: serde_json::to_value(value)? } }),
        Clause::Range { field, bounds } => json!({ "range": { field: serde_json::to_value(bounds)? } }),
    })
}

pub fn mapping_body(mapping: &IndexMapping) -> Value {
    let mut properties = Map::new();
    for field in mapping.fields() {
        let property = match &field.kind {
            FieldKind::Text { analyzer: Some(a) } => json!({ "type": "text", "analyzer": analyzer_name(a) }),
            FieldKind::Text { analyzer: None } => json!({ "type": "text" }),
            FieldKind::Keyword => json!({ "type": "keyword" }),
            FieldKind::Int32 => json!({ "type": "integer" }),
            FieldKind::Int64 => json!({ "type": "long" }),
            FieldKind::Date => json!({ "type": "date" }),
        };
        properties.insert(field.name.clone(), property);
    }
    json!({ "mappings": { "properties": properties } })
}

/// Analyzer names shared with the embedded engine, mapped to their
/// Elasticsearch built-ins. Anything else is passed through.
fn analyzer_name(name: &str) -> &str {
    match name {
        "default" => "standard",
        "raw" => "keyword",
        "stopwords" => "stop",
        "en_stem" => "english",
        other => other,
    }
}

/// Newline-delimited `_bulk` body: one `index` action per item.
pub fn bulk_body(index: &str, items: &[BulkItem]) -> Result<String> {
    let mut body = String::new();
    for item in items {
        let action = json!({ "index": { "_index": index, "_id": item.id.as_str() } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&item.source)?);
        body.push('\n');
    }
    Ok(body)
}

pub fn mget_body(targets: &[GetTarget]) -> Value {
    let docs: Vec<Value> =
        targets.iter().map(|t| json!({ "_index": t.index, "_id": t.id.as_str() })).collect();
    json!({ "docs": docs })
}
