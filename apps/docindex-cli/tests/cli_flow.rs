use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use docindex_cli::{parse_filter, provider, render_highlights, Article, EngineFactory, JsonLinesPopulator};
use docindex_core::config::EngineConfig;
use docindex_core::{Error, FilterValue, HighlightOffset, Index, SearchRequest};

#[test]
fn filters_parse_operator_and_value() {
    let f = parse_filter("category=news").unwrap();
    assert_eq!((f.field.as_str(), f.operation.as_str()), ("category", ""));
    assert_eq!(f.value, FilterValue::String("news".into()));

    let f = parse_filter("views>=10").unwrap();
    assert_eq!((f.field.as_str(), f.operation.as_str(), &f.value), ("views", "gte", &FilterValue::Integer(10)));

    assert_eq!(parse_filter("views<3").unwrap().operation, "lt");
    assert_eq!(parse_filter("views<=3").unwrap().operation, "lte");
    assert_eq!(parse_filter("views>3").unwrap().operation, "gt");
    assert!(matches!(parse_filter("published<2024-01-01T00:00:00Z").unwrap().value, FilterValue::Timestamp(_)));

    assert!(matches!(parse_filter("novalue"), Err(Error::Validation(_))));
    assert!(matches!(parse_filter("=x"), Err(Error::Validation(_))));
}

#[test]
fn highlights_render_in_brackets() {
    let offsets = [HighlightOffset::new(4, 5), HighlightOffset::new(16, 3)];
    assert_eq!(render_highlights("the quick brown fox", &offsets), "the [quick] brown [fox]");
    assert_eq!(render_highlights("plain", &[]), "plain");
}

#[test]
fn engine_is_chosen_by_url_scheme() {
    let http = EngineConfig { url: "https://search.local:9200".into(), ..EngineConfig::default() };
    assert_eq!(EngineFactory::from_config(http).kind(), "elasticsearch");
    assert_eq!(EngineFactory::from_config(EngineConfig::default()).kind(), "tantivy");
}

#[tokio::test]
async fn regenerate_from_json_lines() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"id":"a1","title":"The quick brown fox","body":"jumps over the lazy dog","category":"animals"}}"#).unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"id":"a2","title":"Cooking with fire","category":"food"}}"#).unwrap();

    let cancel = CancellationToken::new();
    let index = Index::<Article>::new(provider(EngineConfig::default()))
        .unwrap()
        .with_populator(Arc::new(JsonLinesPopulator::new(file.path())));
    index.regenerate(&cancel).await.unwrap();
    assert_eq!(index.stats(&cancel).await.unwrap().document_count, 2);

    let read = index.read_operations();
    let response = read.search(SearchRequest::new("fox").highlight(true), &cancel).await.unwrap();
    assert_eq!(response.total_hits, 1);
    let hit = &response.hits[0];
    assert_eq!(hit.id, "a1");
    assert_eq!(render_highlights(&hit.item.as_ref().unwrap().title, &hit.highlights["title"]), "The quick brown [fox]");

    let food = read.search(SearchRequest::new("").filter(parse_filter("category=food").unwrap()), &cancel).await.unwrap();
    assert_eq!(food.hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["a2"]);
}

#[test]
fn bad_lines_name_the_line() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"id":"a1","title":"ok"}}"#).unwrap();
    writeln!(file, "not json").unwrap();
    match JsonLinesPopulator::new(file.path()).read() {
        Err(Error::Validation(msg)) => assert!(msg.contains(":2:"), "{msg}"),
        other => panic!("expected a validation error, got {other:?}"),
    }
}
