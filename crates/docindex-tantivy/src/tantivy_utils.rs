//! Schema and analyzer setup shared by every collection.
//!
//! Each collection carries two reserved fields next to the mapped ones:
//! `_id` (the normalized document key, raw and stored) and `_source` (the
//! full JSON document, stored only).
use tantivy::schema::{
	DateOptions, Field, IndexRecordOption, NumericOptions, Schema, TextFieldIndexing, TextOptions, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

use docindex_core::mapping::{FieldKind, FieldMapping, IndexMapping};
use docindex_core::{Error, Result};

pub const ID_FIELD: &str = "_id";
pub const SOURCE_FIELD: &str = "_source";

/// Lowercasing analyzer that also drops common English stop words.
pub const STOPWORDS_ANALYZER: &str = "stopwords";

/// Analyzers a text field may name. Everything but `stopwords` ships with tantivy.
pub const ANALYZERS: &[&str] = &["default", "raw", "en_stem", "whitespace", STOPWORDS_ANALYZER];

#[derive(Debug, Clone)]
pub struct Fields {
	pub id: Field,
	pub source: Field,
	pub mapped: Vec<(Field, FieldMapping)>,
}

impl Fields {
	pub fn get(&self, name: &str) -> Option<(Field, &FieldMapping)> {
		self.mapped.iter().find(|(_, m)| m.name == name).map(|(f, m)| (*f, m))
	}

	pub fn text(&self) -> impl Iterator<Item = (Field, &FieldMapping)> {
		self.mapped.iter().filter(|(_, m)| matches!(m.kind, FieldKind::Text { .. })).map(|(f, m)| (*f, m))
	}
}

pub fn check_analyzers(mapping: &IndexMapping) -> Result<()> {
	for field in mapping.fields() {
		if let FieldKind::Text { analyzer: Some(name) } = &field.kind {
			if !ANALYZERS.contains(&name.as_str()) {
				return Err(Error::engine_status(400, format!("unknown analyzer '{name}' on field '{}'", field.name)));
			}
		}
	}
	Ok(())
}

pub fn build_schema(mapping: &IndexMapping) -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(ID_FIELD, STRING | STORED);
	schema_builder.add_text_field(SOURCE_FIELD, STORED);
	for field in mapping.fields() {
		match &field.kind {
			FieldKind::Text { analyzer } => {
				let indexing = TextFieldIndexing::default()
					.set_tokenizer(analyzer.as_deref().unwrap_or("default"))
					.set_index_option(IndexRecordOption::WithFreqsAndPositions);
				schema_builder.add_text_field(&field.name, TextOptions::default().set_indexing_options(indexing));
			}
			FieldKind::Keyword => { schema_builder.add_text_field(&field.name, STRING); }
			FieldKind::Int32 | FieldKind::Int64 => {
				schema_builder.add_i64_field(&field.name, NumericOptions::default().set_indexed().set_fast());
			}
			FieldKind::Date => {
				schema_builder.add_date_field(&field.name, DateOptions::default().set_indexed().set_fast());
			}
		}
	}
	schema_builder.build()
}

/// Resolve the reserved and mapped fields of an opened index.
pub fn resolve_fields(schema: &Schema, mapping: &IndexMapping) -> Result<Fields> {
	let lookup = |name: &str| {
		schema.get_field(name).map_err(|e| Error::engine_response(format!("schema is missing field '{name}': {e}")))
	};
	let mapped = mapping.fields().iter().map(|m| Ok((lookup(&m.name)?, m.clone()))).collect::<Result<Vec<_>>>()?;
	Ok(Fields { id: lookup(ID_FIELD)?, source: lookup(SOURCE_FIELD)?, mapped })
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(STOPWORDS_ANALYZER, tokenizer);
}
