use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use docindex_core::config::EngineConfig;
use docindex_core::mapping::{Document, IndexMapping};
use docindex_core::provider::SharedClient;
use docindex_core::query::{BoolQuery, Clause, HighlightSpec, NativeQuery};
use docindex_core::traits::{ClientFactory, ClientProvider, EngineClient};
use docindex_core::{Error, Filter, GetRequest, Index, Result, SearchRequest};
use docindex_tantivy::{TantivyClientFactory, TantivyEngine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Article {
    id: i32,
    title: String,
    body: String,
    status: String,
    views: i64,
    published: DateTime<Utc>,
}

impl Document for Article {
    fn mapping() -> Result<IndexMapping> {
        IndexMapping::builder()
            .key("id")
            .text("title")
            .text_with_analyzer("body", "stopwords")
            .keyword("status")
            .int64("views")
            .date("published")
            .build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Reading {
    id: String,
    value: i64,
}

impl Document for Reading {
    fn mapping() -> Result<IndexMapping> {
        IndexMapping::builder().key("id").int32("value").build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tagged {
    id: String,
    tags: Vec<String>,
}

impl Document for Tagged {
    fn mapping() -> Result<IndexMapping> {
        IndexMapping::builder().key("id").text("tags").build()
    }
}

fn article(id: i32, title: &str, body: &str, status: &str, views: i64, day: u32) -> Article {
    Article {
        id,
        title: title.into(),
        body: body.into(),
        status: status.into(),
        views,
        published: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
    }
}

fn corpus() -> Vec<Article> {
    vec![
        article(1, "The quick brown fox", "jumps over the lazy dog", "published", 120, 1),
        article(2, "Lazy dogs sleep", "nothing to see here", "published", 5, 2),
        article(3, "A fox and a hound", "the fox runs away", "draft", 40, 3),
    ]
}

fn provider(engine: TantivyEngine) -> Arc<dyn ClientProvider> {
    Arc::new(SharedClient::new(Arc::new(engine)))
}

async fn seeded() -> Index<Article> {
    let cancel = CancellationToken::new();
    let index = Index::<Article>::new(provider(TantivyEngine::in_memory())).unwrap();
    index.create(&cancel).await.unwrap();
    index.write_operations().upsert(&corpus(), &cancel).await.unwrap();
    index
}

fn span(text: &str, offset: usize, length: usize) -> String {
    text.chars().skip(offset).take(length).collect()
}

#[tokio::test]
async fn fox_search_highlights_each_match() {
    let index = seeded().await;
    let cancel = CancellationToken::new();

    let response = index.read_operations().search(SearchRequest::new("fox").highlight(true), &cancel).await.unwrap();
    assert_eq!(response.total_hits, 2);
    assert!(response.maximum_score.is_some());

    let mut ids: Vec<&str> = response.hits.iter().map(|h| h.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "3"]);

    for hit in &response.hits {
        let item = hit.item.as_ref().unwrap();
        assert_eq!(hit.index, "article");
        let title = &hit.highlights["title"];
        assert!(!title.is_empty());
        for o in title {
            assert_eq!(span(&item.title, o.offset, o.length).to_lowercase(), "fox");
        }
    }
    let hound = response.hits.iter().find(|h| h.id == "3").unwrap();
    let body = &hound.highlights["body"];
    assert_eq!(body.len(), 1);
    assert_eq!(span("the fox runs away", body[0].offset, body[0].length), "fox");
}

#[tokio::test]
async fn one_fox_in_three_documents() {
    let cancel = CancellationToken::new();
    let index = Index::<Article>::new(provider(TantivyEngine::in_memory())).unwrap();
    index.create(&cancel).await.unwrap();
    let docs = vec![
        article(1, "Lazy dogs sleep", "all day long", "published", 1, 1),
        article(2, "Cats nap", "on the mat", "published", 2, 2),
        article(3, "Night walk", "a red fox crossed the road", "published", 3, 3),
    ];
    index.write_operations().upsert(&docs, &cancel).await.unwrap();

    let request = SearchRequest::new("fox").take(10).highlight(true);
    let response = index.read_operations().search(request, &cancel).await.unwrap();
    assert_eq!(response.total_hits, 1);
    assert_eq!(response.hits.len(), 1);
    let hit = &response.hits[0];
    assert_eq!(hit.id, "3");
    assert!(!hit.highlights.contains_key("title"));
    let body = &hit.highlights["body"];
    assert_eq!(body.len(), 1);
    assert_eq!(span(&docs[2].body, body[0].offset, body[0].length), "fox");
}

#[tokio::test]
async fn results_are_ordered_by_score() {
    let index = seeded().await;
    let response =
        index.read_operations().search(SearchRequest::new("lazy dog"), &CancellationToken::new()).await.unwrap();
    let scores: Vec<Decimal> = response.hits.iter().map(|h| h.score.unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(response.maximum_score, scores.first().copied());
    assert!(response.hits.iter().all(|h| h.highlights.is_empty()));
}

#[tokio::test]
async fn filters_narrow_without_scoring() {
    let index = seeded().await;
    let read = index.read_operations();
    let cancel = CancellationToken::new();

    let only_published = SearchRequest::new("").filter(Filter::equals("status", "published"));
    let response = read.search(only_published, &cancel).await.unwrap();
    assert_eq!(response.total_hits, 2);
    assert!(response.hits.iter().all(|h| h.item.as_ref().unwrap().status == "published"));

    // text matches rank first, the filter alone keeps the rest in the set
    let fox_published =
        SearchRequest::new("fox").filter(Filter::equals("status", "published"));
    let response = read.search(fox_published, &cancel).await.unwrap();
    assert_eq!(response.hits[0].id, "1");
    assert!(response.hits.iter().all(|h| h.id != "3"));
}

#[tokio::test]
async fn range_filters_on_numbers_and_dates() {
    let index = seeded().await;
    let read = index.read_operations();
    let cancel = CancellationToken::new();

    let busy = SearchRequest::new("").filter(Filter::new("views", "gt", 40i64));
    let response = read.search(busy, &cancel).await.unwrap();
    assert_eq!(response.hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["1"]);

    let at_least = SearchRequest::new("").filter(Filter::new("views", "GTE", 40i64));
    assert_eq!(read.search(at_least, &cancel).await.unwrap().total_hits, 2);

    let early = SearchRequest::new("")
        .filter(Filter::new("published", "lte", Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()));
    assert_eq!(read.search(early, &cancel).await.unwrap().total_hits, 2);

    let before = SearchRequest::new("").filter(Filter::new("published", "lt", "2024-01-02T00:00:00Z"));
    let response = read.search(before, &cancel).await.unwrap();
    assert_eq!(response.hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["1"]);
}

#[tokio::test]
async fn paging_and_minimum_score() {
    let index = seeded().await;
    let read = index.read_operations();
    let cancel = CancellationToken::new();

    let all = read.search(SearchRequest::new("fox"), &cancel).await.unwrap();
    let second = read.search(SearchRequest::new("fox").skip(1).take(1), &cancel).await.unwrap();
    assert_eq!(second.total_hits, 2);
    assert_eq!(second.hits.len(), 1);
    assert_eq!(second.hits[0].id, all.hits[1].id);

    let none = read.search(SearchRequest::new("fox").minimum_score(Decimal::from(1000)), &cancel).await.unwrap();
    assert_eq!(none.total_hits, 0);
    assert!(none.hits.is_empty());
    assert_eq!(none.maximum_score, None);
}

#[tokio::test]
async fn skip_past_the_end_is_an_empty_page() {
    let index = seeded().await;
    let read = index.read_operations();
    let cancel = CancellationToken::new();

    let far = read.search(SearchRequest::new("fox").skip(1i64 << 60).take(10), &cancel).await.unwrap();
    assert_eq!(far.total_hits, 2);
    assert!(far.hits.is_empty());
    assert!(far.maximum_score.is_some());

    let just_past = read.search(SearchRequest::new("").filter(Filter::equals("status", "draft")).skip(3), &cancel).await.unwrap();
    assert_eq!(just_past.total_hits, 1);
    assert!(just_past.hits.is_empty());
}

#[tokio::test]
async fn array_text_fields_match_without_highlights() {
    let cancel = CancellationToken::new();
    let index = Index::<Tagged>::new(provider(TantivyEngine::in_memory())).unwrap();
    index.create(&cancel).await.unwrap();
    let docs = vec![
        Tagged { id: "t1".into(), tags: vec!["red fox".into(), "woods".into()] },
        Tagged { id: "t2".into(), tags: vec!["river".into()] },
    ];
    index.write_operations().upsert(&docs, &cancel).await.unwrap();

    let response = index.read_operations().search(SearchRequest::new("fox").highlight(true), &cancel).await.unwrap();
    assert_eq!(response.hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["t1"]);
    assert!(response.hits[0].highlights.is_empty());
}

#[tokio::test]
async fn get_returns_found_documents_once() {
    let index = seeded().await;
    let read = index.read_operations();
    let cancel = CancellationToken::new();

    let response = read.get(GetRequest::new([1, 3, 99, 1]), &cancel).await.unwrap();
    assert_eq!(response.total_hits, 2);
    let mut ids: Vec<i32> = response.hits.iter().map(|h| h.item.as_ref().unwrap().id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 3]);

    assert_eq!(read.get_one(2, &cancel).await.unwrap().unwrap().title, "Lazy dogs sleep");
    assert!(read.get_one(42, &cancel).await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_replaces_by_key() {
    let index = seeded().await;
    let cancel = CancellationToken::new();

    let replacement = article(1, "A slow grey wolf", "walks", "published", 1, 1);
    index.write_operations().upsert(&[replacement.clone()], &cancel).await.unwrap();

    let read = index.read_operations();
    assert_eq!(read.get_one(1, &cancel).await.unwrap(), Some(replacement));
    let fox = read.search(SearchRequest::new("fox"), &cancel).await.unwrap();
    assert_eq!(fox.hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["3"]);
    assert_eq!(index.stats(&cancel).await.unwrap().document_count, 3);
}

#[tokio::test]
async fn bulk_failures_are_aggregated() {
    let cancel = CancellationToken::new();
    let index = Index::<Reading>::new(provider(TantivyEngine::in_memory())).unwrap();
    index.create(&cancel).await.unwrap();

    let readings = vec![Reading { id: "ok".into(), value: 7 }, Reading { id: "big".into(), value: 5_000_000_000 }];
    match index.write_operations().upsert(&readings, &cancel).await {
        Err(Error::EngineWrite { failed, total, detail }) => {
            assert_eq!((failed, total), (1, 2));
            assert!(detail.to_string().contains("big"));
        }
        other => panic!("expected a write error, got {other:?}"),
    }
    // the valid document still landed
    assert!(index.read_operations().get_one("ok", &cancel).await.unwrap().is_some());
}

#[tokio::test]
async fn lifecycle_create_destroy_regenerate() {
    let cancel = CancellationToken::new();
    let index = Index::<Article>::with_name("news", provider(TantivyEngine::in_memory())).unwrap();

    assert!(!index.exists(&cancel).await.unwrap());
    index.destroy(&cancel).await.unwrap();
    index.create(&cancel).await.unwrap();
    assert!(index.exists(&cancel).await.unwrap());
    assert!(matches!(index.create(&cancel).await, Err(Error::EngineResponse { status: Some(400), .. })));

    index.write_operations().upsert(&corpus(), &cancel).await.unwrap();
    index.regenerate(&cancel).await.unwrap();
    assert_eq!(index.stats(&cancel).await.unwrap().document_count, 0);

    index.destroy(&cancel).await.unwrap();
    assert!(!index.exists(&cancel).await.unwrap());
    let err = index.read_operations().search(SearchRequest::new("fox"), &cancel).await.unwrap_err();
    assert!(err.is_not_found());
    let err = index.read_operations().get_one(1, &cancel).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
    assert!(err.to_string().contains("no such index [news]"));
}

#[tokio::test]
async fn directory_engine_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let config = EngineConfig { url: format!("file://{}", dir.path().display()), ..EngineConfig::default() };

    let client = TantivyClientFactory::new(config.clone()).create_client().await.unwrap();
    let index = Index::<Article>::new(Arc::new(SharedClient::new(client))).unwrap();
    index.create(&cancel).await.unwrap();
    index.write_operations().upsert(&corpus(), &cancel).await.unwrap();
    let stats = index.stats(&cancel).await.unwrap();
    assert_eq!(stats.document_count, 3);
    assert!(stats.size_in_bytes.unwrap() > 0);
    drop(index);

    let reopened = TantivyClientFactory::new(config).create_client().await.unwrap();
    let index = Index::<Article>::new(Arc::new(SharedClient::new(reopened))).unwrap();
    assert!(index.exists(&cancel).await.unwrap());
    assert_eq!(index.read_operations().get_one(3, &cancel).await.unwrap().unwrap().title, "A fox and a hound");

    index.destroy(&cancel).await.unwrap();
    assert!(!dir.path().join("article").exists());
}

#[tokio::test]
async fn marker_collisions_are_rejected() {
    let engine = TantivyEngine::in_memory();
    let mapping = IndexMapping::builder().key("id").text("title").build().unwrap();
    engine.create_index("notes", &mapping).await.unwrap();
    let items = vec![docindex_core::wire::BulkItem {
        id: docindex_core::DocumentKey::from("n1").normalize(),
        source: serde_json::json!({ "id": "n1", "title": "fox ## fox" }),
    }];
    engine.bulk_index("notes", items).await.unwrap();

    let query = NativeQuery {
        index: "notes".into(),
        from: None,
        size: None,
        min_score: None,
        query: BoolQuery { should: vec![Clause::Match { field: "title".into(), query: "fox".into() }], filter: vec![] },
        highlight: Some(HighlightSpec { marker: "##".into() }),
    };
    let err = engine.search(&query).await.unwrap_err();
    assert!(matches!(err, Error::EngineResponse { status: Some(400), .. }));
}

#[test]
fn engine_urls() {
    assert!(TantivyEngine::from_url("memory://").is_ok());
    assert!(matches!(TantivyEngine::from_url("http://localhost:9200"), Err(Error::InvalidConfig(_))));
}
