use serde_json::json;

use docindex_core::config::EngineConfig;
use docindex_core::highlight::HighlightMarker;
use docindex_core::mapping::IndexMapping;
use docindex_core::query::translate;
use docindex_core::traits::ClientFactory;
use docindex_core::wire::{BulkItem, GetTarget};
use docindex_core::{DocumentKey, Error, Filter, SearchRequest};
use docindex_elastic::dsl::{bulk_body, mapping_body, mget_body, search_body};
use docindex_elastic::{ElasticClient, ElasticClientFactory};

fn mapping() -> IndexMapping {
    IndexMapping::builder()
        .key("id")
        .text("title")
        .text_with_analyzer("body", "stopwords")
        .keyword("status")
        .int32("views")
        .date("published")
        .build()
        .unwrap()
}

#[test]
fn search_body_splits_should_and_filter() {
    let request = SearchRequest::new("fox")
        .filter(Filter::equals("status", "published"))
        .filter(Filter::new("views", "gte", 10i64))
        .skip(20)
        .take(5);
    let native = translate("article", &request, &mapping(), None).unwrap();

    assert_eq!(
        search_body(&native).unwrap(),
        json!({
            "from": 20,
            "size": 5,
            "query": { "bool": {
                "should": [
                    { "match": { "title": { "query": "fox" } } },
                    { "match": { "body": { "query": "fox" } } }
                ],
                "filter": [
                    { "term": { "status": "published" } },
                    { "range": { "views": { "gte": 10 } } }
                ]
            } }
        })
    );
}

#[test]
fn search_body_highlights_whole_fields_with_the_marker() {
    let marker = HighlightMarker::allocate();
    let native = translate("article", &SearchRequest::new("fox").highlight(true), &mapping(), Some(&marker)).unwrap();
    let body = search_body(&native).unwrap();

    assert_eq!(body["highlight"]["pre_tags"], json!([marker.as_str()]));
    assert_eq!(body["highlight"]["post_tags"], json!([marker.as_str()]));
    assert_eq!(body["highlight"]["fields"]["*"]["number_of_fragments"], json!(0));
    assert!(body.get("from").is_none());
    assert!(body.get("size").is_none());
}

#[test]
fn search_body_without_clauses_matches_all() {
    let mut native = translate("article", &SearchRequest::new("fox"), &mapping(), None).unwrap();
    native.query.should.clear();
    native.min_score = Some(0.5);
    let body = search_body(&native).unwrap();
    assert_eq!(body["query"], json!({ "match_all": {} }));
    assert_eq!(body["min_score"], json!(0.5));
}

#[test]
fn mapping_body_uses_engine_types() {
    assert_eq!(
        mapping_body(&mapping()),
        json!({ "mappings": { "properties": {
            "title": { "type": "text" },
            "body": { "type": "text", "analyzer": "stop" },
            "status": { "type": "keyword" },
            "views": { "type": "integer" },
            "published": { "type": "date" }
        } } })
    );
}

#[test]
fn bulk_body_is_ndjson() {
    let items = vec![
        BulkItem { id: DocumentKey::from(1).normalize(), source: json!({ "id": 1, "title": "a" }) },
        BulkItem { id: DocumentKey::from("x").normalize(), source: json!({ "id": "x" }) },
    ];
    let body = bulk_body("article", &items).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(body.ends_with('\n'));
    assert_eq!(serde_json::from_str::<serde_json::Value>(lines[0]).unwrap(), json!({ "index": { "_index": "article", "_id": "1" } }));
    assert_eq!(serde_json::from_str::<serde_json::Value>(lines[3]).unwrap(), json!({ "id": "x" }));
}

#[test]
fn mget_body_lists_targets() {
    let targets = vec![
        GetTarget { index: "article".into(), id: DocumentKey::from(1).normalize() },
        GetTarget { index: "note".into(), id: DocumentKey::from("n").normalize() },
    ];
    assert_eq!(
        mget_body(&targets),
        json!({ "docs": [ { "_index": "article", "_id": "1" }, { "_index": "note", "_id": "n" } ] })
    );
}

#[tokio::test]
async fn factory_requires_an_http_url() {
    let config = EngineConfig { url: "http://localhost:9200/".into(), enable_compression: true, request_timeout_secs: 5 };
    let client = ElasticClient::new(&config).unwrap();
    assert_eq!(client.base_url(), "http://localhost:9200");
    assert!(ElasticClientFactory::new(config).create_client().await.is_ok());

    let embedded = EngineConfig::default();
    assert!(matches!(ElasticClientFactory::new(embedded).create_client().await, Err(Error::InvalidConfig(_))));
}
