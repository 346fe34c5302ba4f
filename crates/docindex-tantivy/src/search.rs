//! Execution of a [`NativeQuery`] against one collection.
//!
//! `should` clauses are scored and optional once any filter is present;
//! filters are wrapped in a zero-score constant query so they only narrow
//! the result set.
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::ops::Range;

use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, ConstScoreQuery, EmptyQuery, Occur, Query, QueryParser, RangeQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TokenStream;
use tantivy::{DocAddress, Score, Searcher, TantivyDocument, Term};

use docindex_core::highlight::mark;
use docindex_core::mapping::{FieldKind, FieldMapping};
use docindex_core::query::{Clause, NativeQuery, RangeBounds, DEFAULT_PAGE_SIZE};
use docindex_core::wire::{EngineHit, EngineSearchResponse};
use docindex_core::{Error, FilterValue, Result};

use crate::index::{engine_error, parse_date, Collection};

pub fn execute(collection: &Collection, native: &NativeQuery) -> Result<EngineSearchResponse> {
	let should = native.query.should.iter().map(|c| build_clause(collection, c)).collect::<Result<Vec<_>>>()?;
	let filter = native.query.filter.iter().map(|c| build_clause(collection, c)).collect::<Result<Vec<_>>>()?;

	let mut terms: HashSet<Term> = HashSet::new();
	for q in &should {
		q.query_terms(&mut |term, _| { terms.insert(term.clone()); });
	}

	let query: Box<dyn Query> = if should.is_empty() && filter.is_empty() {
		Box::new(AllQuery)
	} else {
		let mut clauses: Vec<(Occur, Box<dyn Query>)> = should.into_iter().map(|q| (Occur::Should, q)).collect();
		clauses.extend(filter.into_iter().map(|q| (Occur::Must, Box::new(ConstScoreQuery::new(q, 0.0)) as Box<dyn Query>)));
		Box::new(BooleanQuery::new(clauses))
	};

	let searcher = collection.searcher();
	let from = native.from.unwrap_or(0);
	let size = native.size.unwrap_or(DEFAULT_PAGE_SIZE);
	let (total, max_score, page) = collect(&searcher, query.as_ref(), native.min_score, from, size)?;

	let mut hits = Vec::with_capacity(page.len());
	for (score, address) in page {
		let doc: TantivyDocument = searcher.doc(address).map_err(|e| engine_error("loading document", e))?;
		let source = collection.source_of(&doc)?;
		let highlight = match &native.highlight {
			Some(spec) => highlight(collection, &terms, &source, &spec.marker)?,
			None => BTreeMap::new(),
		};
		hits.push(EngineHit {
			index: collection.name().to_string(),
			id: collection.id_of(&doc),
			score: Some(f64::from(score)),
			source: Some(source),
			highlight,
		});
	}
	tracing::debug!(index = collection.name(), total, returned = hits.len(), "search executed");
	Ok(EngineSearchResponse { total, max_score, hits })
}

type Page = (u64, Option<f64>, Vec<(Score, DocAddress)>);

fn collect(searcher: &Searcher, query: &dyn Query, min_score: Option<f64>, from: usize, size: usize) -> Result<Page> {
	let search_err = |e: tantivy::TantivyError| engine_error("search", e);
	match min_score {
		None => {
			let num_docs = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
			// a page past the last document is empty but still counts
			let limit = from.saturating_add(size).min(num_docs).max(1);
			let (count, top) = searcher.search(query, &(Count, TopDocs::with_limit(limit))).map_err(search_err)?;
			let max_score = top.first().map(|(s, _)| f64::from(*s));
			Ok((count as u64, max_score, top.into_iter().skip(from).take(size).collect()))
		}
		Some(min) => {
			// the floor applies before paging, so every match is scored
			let limit = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX).max(1);
			let mut top = searcher.search(query, &TopDocs::with_limit(limit)).map_err(search_err)?;
			top.retain(|(s, _)| f64::from(*s) >= min);
			let max_score = top.first().map(|(s, _)| f64::from(*s));
			Ok((top.len() as u64, max_score, top.into_iter().skip(from).take(size).collect()))
		}
	}
}

fn build_clause(collection: &Collection, clause: &Clause) -> Result<Box<dyn Query>> {
	let fields = collection.fields();
	match clause {
		Clause::Match { field, query } => match fields.get(field) {
			Some((f, _)) => Ok(parse(collection, vec![f], query)),
			None => Ok(unknown_field(field)),
		},
		Clause::QueryString { query } => {
			let targets: Vec<Field> = fields
				.mapped
				.iter()
				.filter(|(_, m)| matches!(m.kind, FieldKind::Text { .. } | FieldKind::Keyword))
				.map(|(f, _)| *f)
				.collect();
			if targets.is_empty() { return Ok(Box::new(EmptyQuery)); }
			Ok(parse(collection, targets, query))
		}
		Clause::Term { field, value } => match fields.get(field) {
			Some((f, mapping)) => term_query(collection, f, mapping, value),
			None => Ok(unknown_field(field)),
		},
		Clause::Range { field, bounds } => match fields.get(field) {
			Some((f, mapping)) => range_query(f, mapping, bounds),
			None => Ok(unknown_field(field)),
		},
	}
}

// unmapped fields hold no values, so nothing matches
fn unknown_field(field: &str) -> Box<dyn Query> {
	tracing::debug!(field, "query references an unmapped field");
	Box::new(EmptyQuery)
}

fn parse(collection: &Collection, fields: Vec<Field>, text: &str) -> Box<dyn Query> {
	let parser = QueryParser::for_index(collection.index(), fields);
	let (query, errors) = parser.parse_query_lenient(text);
	if !errors.is_empty() {
		tracing::debug!(text, errors = errors.len(), "lenient query parse dropped parts of the query");
	}
	query
}

fn term_query(collection: &Collection, field: Field, mapping: &FieldMapping, value: &FilterValue) -> Result<Box<dyn Query>> {
	if let FieldKind::Text { .. } = mapping.kind {
		// analyzed fields match on every token of the value
		let mut analyzer = collection.index().tokenizer_for_field(field).map_err(|e| engine_error("tokenizer", e))?;
		let mut tokens = Vec::new();
		analyzer.token_stream(&text_of(value)).process(&mut |t| tokens.push(t.text.clone()));
		let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
			.into_iter()
			.map(|t| {
				let q: Box<dyn Query> = Box::new(TermQuery::new(Term::from_field_text(field, &t), IndexRecordOption::Basic));
				(Occur::Must, q)
			})
			.collect();
		if clauses.is_empty() { return Ok(Box::new(EmptyQuery)); }
		return Ok(Box::new(BooleanQuery::new(clauses)));
	}
	let term = to_term(field, mapping, value)?;
	Ok(Box::new(TermQuery::new(term, IndexRecordOption::Basic)))
}

fn range_query(field: Field, mapping: &FieldMapping, bounds: &RangeBounds) -> Result<Box<dyn Query>> {
	let bound = |inclusive: &Option<FilterValue>, exclusive: &Option<FilterValue>| -> Result<Bound<Term>> {
		Ok(match (inclusive, exclusive) {
			(_, Some(v)) => Bound::Excluded(to_term(field, mapping, v)?),
			(Some(v), None) => Bound::Included(to_term(field, mapping, v)?),
			(None, None) => Bound::Unbounded,
		})
	};
	let lower = bound(&bounds.gte, &bounds.gt)?;
	let upper = bound(&bounds.lte, &bounds.lt)?;
	Ok(Box::new(RangeQuery::new(lower, upper)))
}

fn to_term(field: Field, mapping: &FieldMapping, value: &FilterValue) -> Result<Term> {
	let mismatch = || Error::engine_status(400, format!("filter value {value:?} does not fit field '{}'", mapping.name));
	match mapping.kind {
		FieldKind::Text { .. } | FieldKind::Keyword => Ok(Term::from_field_text(field, &text_of(value))),
		FieldKind::Int32 | FieldKind::Int64 => {
			let v = match value {
				FilterValue::Integer(i) => *i,
				FilterValue::Float(f) if f.fract() == 0.0 => *f as i64,
				FilterValue::String(s) => s.trim().parse().map_err(|_| mismatch())?,
				_ => return Err(mismatch()),
			};
			Ok(Term::from_field_i64(field, v))
		}
		FieldKind::Date => {
			let v = match value {
				FilterValue::Timestamp(ts) => tantivy::DateTime::from_timestamp_micros(ts.timestamp_micros()),
				FilterValue::String(s) => parse_date(s).ok_or_else(mismatch)?,
				FilterValue::Integer(ms) => tantivy::DateTime::from_timestamp_millis(*ms),
				_ => return Err(mismatch()),
			};
			Ok(Term::from_field_date(field, v))
		}
	}
}

fn text_of(value: &FilterValue) -> String {
	match value {
		FilterValue::Boolean(b) => b.to_string(),
		FilterValue::Integer(i) => i.to_string(),
		FilterValue::Float(f) => f.to_string(),
		FilterValue::Timestamp(ts) => ts.to_rfc3339(),
		FilterValue::String(s) => s.clone(),
	}
}

/// Re-tokenize every text field of `source` and wrap the tokens the query
/// matched in `marker`. Each field comes back whole, as a single fragment.
fn highlight(
	collection: &Collection,
	terms: &HashSet<Term>,
	source: &serde_json::Value,
	marker: &str,
) -> Result<BTreeMap<String, Vec<String>>> {
	let mut out = BTreeMap::new();
	if terms.is_empty() { return Ok(out); }
	for (field, mapping) in collection.fields().text() {
		let Some(text) = source.get(&mapping.name).and_then(|v| v.as_str()) else { continue };
		let mut analyzer = collection.index().tokenizer_for_field(field).map_err(|e| engine_error("tokenizer", e))?;
		let mut spans: Vec<Range<usize>> = Vec::new();
		analyzer.token_stream(text).process(&mut |token| {
			if terms.contains(&Term::from_field_text(field, &token.text)) {
				spans.push(token.offset_from..token.offset_to);
			}
		});
		if spans.is_empty() { continue; }
		if text.contains(marker) {
			return Err(Error::engine_status(400, format!("field '{}' already contains the highlight marker", mapping.name)));
		}
		spans.sort_by_key(|s| s.start);
		spans.dedup_by(|next, prev| next.start < prev.end);
		out.insert(mapping.name.clone(), vec![mark(text, &spans, marker)]);
	}
	Ok(out)
}
