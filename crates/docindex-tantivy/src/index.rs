//! One tantivy index per collection, with its mapping alongside.
use chrono::DateTime as ChronoDateTime;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tantivy::collector::TopDocs;
use tantivy::query::TermQuery;
use tantivy::schema::{IndexRecordOption, Value as _};
use tantivy::{DateTime, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};

use docindex_core::mapping::{FieldKind, IndexMapping};
use docindex_core::wire::{BulkItem, BulkItemOutcome, BulkResponse};
use docindex_core::{Error, Result};

use crate::tantivy_utils::{build_schema, check_analyzers, register_tokenizer, resolve_fields, Fields};

const WRITER_MEMORY: usize = 50_000_000;
const MAPPING_FILE: &str = "mapping.json";
const DATA_DIR: &str = "data";

pub(crate) fn engine_error(context: &str, e: impl std::fmt::Display) -> Error {
	Error::engine_response(format!("{context}: {e}"))
}

pub struct Collection {
	name: String,
	dir: Option<PathBuf>,
	index: Index,
	reader: IndexReader,
	// opened on first write so read-only handles can share a directory
	writer: Mutex<Option<IndexWriter>>,
	fields: Fields,
}

impl Collection {
	/// Create a new collection. With `dir` the index and its `mapping.json`
	/// are written under it, otherwise the index lives in RAM.
	pub fn create(name: &str, mapping: &IndexMapping, dir: Option<&Path>) -> Result<Self> {
		check_analyzers(mapping)?;
		let schema = build_schema(mapping);
		let index = match dir {
			Some(dir) => {
				let data = dir.join(DATA_DIR);
				std::fs::create_dir_all(&data).map_err(|e| engine_error("creating index directory", e))?;
				let bytes = serde_json::to_vec_pretty(mapping)?;
				std::fs::write(dir.join(MAPPING_FILE), bytes).map_err(|e| engine_error("writing mapping", e))?;
				Index::create_in_dir(&data, schema).map_err(|e| engine_error("creating index", e))?
			}
			None => Index::create_in_ram(schema),
		};
		Self::from_index(name, dir.map(Path::to_path_buf), index, mapping.clone())
	}

	/// Open a collection previously created under `dir`.
	pub fn open(name: &str, dir: &Path) -> Result<Self> {
		let bytes = std::fs::read(dir.join(MAPPING_FILE)).map_err(|e| engine_error("reading mapping", e))?;
		let mapping: IndexMapping = serde_json::from_slice(&bytes)?;
		let index = Index::open_in_dir(dir.join(DATA_DIR)).map_err(|e| engine_error("opening index", e))?;
		Self::from_index(name, Some(dir.to_path_buf()), index, mapping)
	}

	fn from_index(name: &str, dir: Option<PathBuf>, index: Index, mapping: IndexMapping) -> Result<Self> {
		register_tokenizer(&index);
		let fields = resolve_fields(&index.schema(), &mapping)?;
		let reader = index
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()
			.map_err(|e| engine_error("opening reader", e))?;
		Ok(Self { name: name.to_string(), dir, index, reader, writer: Mutex::new(None), fields })
	}

	pub fn name(&self) -> &str { &self.name }
	pub fn index(&self) -> &Index { &self.index }
	pub fn fields(&self) -> &Fields { &self.fields }
	pub fn searcher(&self) -> Searcher { self.reader.searcher() }

	/// Replace-or-insert every item in one commit. Items that do not fit the
	/// mapping are reported individually and skipped.
	pub fn write(&self, items: Vec<BulkItem>) -> Result<BulkResponse> {
		self.write_with(items, |writer| writer.commit().map(|_| ()).map_err(|e| engine_error("committing", e)))
	}

	fn write_with<C>(&self, items: Vec<BulkItem>, commit: C) -> Result<BulkResponse>
	where
		C: FnOnce(&mut IndexWriter) -> Result<()>,
	{
		let mut guard = self.writer.lock();
		if guard.is_none() {
			*guard = Some(self.index.writer_with_num_threads(1, WRITER_MEMORY).map_err(|e| engine_error("opening writer", e))?);
		}
		let writer = guard.as_mut().ok_or_else(|| Error::engine_response("index writer unavailable"))?;
		let staged = self.stage(writer, items).and_then(|outcomes| commit(writer).map(|_| outcomes));
		let outcomes = match staged {
			Ok(outcomes) => outcomes,
			Err(e) => {
				// a dropped writer discards its uncommitted operations
				*guard = None;
				return Err(e);
			}
		};
		drop(guard);
		self.reader.reload().map_err(|e| engine_error("reloading reader", e))?;
		tracing::debug!(index = %self.name, items = outcomes.len(), "committed bulk write");
		Ok(BulkResponse { items: outcomes })
	}

	fn stage(&self, writer: &mut IndexWriter, items: Vec<BulkItem>) -> Result<Vec<BulkItemOutcome>> {
		let mut outcomes = Vec::with_capacity(items.len());
		for item in items {
			let id = item.id.into_string();
			match self.to_document(&id, &item.source) {
				Ok(doc) => {
					writer.delete_term(Term::from_field_text(self.fields.id, &id));
					writer.add_document(doc).map_err(|e| engine_error("adding document", e))?;
					outcomes.push(BulkItemOutcome { id, error: None });
				}
				Err(reason) => {
					let error = json!({ "type": "document_parsing_exception", "reason": reason });
					outcomes.push(BulkItemOutcome { id, error: Some(error) });
				}
			}
		}
		Ok(outcomes)
	}

	/// The stored source of `id`, if present.
	pub fn get(&self, id: &str) -> Result<Option<Value>> {
		let searcher = self.searcher();
		let query = TermQuery::new(Term::from_field_text(self.fields.id, id), IndexRecordOption::Basic);
		let top = searcher.search(&query, &TopDocs::with_limit(1)).map_err(|e| engine_error("get", e))?;
		match top.first() {
			Some((_, address)) => {
				let doc: TantivyDocument = searcher.doc(*address).map_err(|e| engine_error("loading document", e))?;
				self.source_of(&doc).map(Some)
			}
			None => Ok(None),
		}
	}

	pub fn id_of(&self, doc: &TantivyDocument) -> String {
		doc.get_first(self.fields.id).and_then(|v| v.as_str()).unwrap_or_default().to_string()
	}

	pub fn source_of(&self, doc: &TantivyDocument) -> Result<Value> {
		match doc.get_first(self.fields.source).and_then(|v| v.as_str()) {
			Some(raw) => Ok(serde_json::from_str(raw)?),
			None => Ok(Value::Null),
		}
	}

	pub fn doc_count(&self) -> u64 {
		self.searcher().num_docs()
	}

	pub fn size_in_bytes(&self) -> Option<u64> {
		let dir = self.dir.as_ref()?;
		let total = walkdir::WalkDir::new(dir)
			.into_iter()
			.filter_map(|e| e.ok())
			.filter(|e| e.file_type().is_file())
			.filter_map(|e| e.metadata().ok())
			.map(|m| m.len())
			.sum();
		Some(total)
	}

	fn to_document(&self, id: &str, source: &Value) -> std::result::Result<TantivyDocument, String> {
		let Value::Object(object) = source else {
			return Err("document source must be a JSON object".to_string());
		};
		let mut doc = TantivyDocument::default();
		doc.add_text(self.fields.id, id);
		doc.add_text(self.fields.source, source.to_string());
		for (field, mapping) in &self.fields.mapped {
			let values = match object.get(&mapping.name) {
				None | Some(Value::Null) => continue,
				Some(Value::Array(values)) => values.iter().collect::<Vec<_>>(),
				Some(value) => vec![value],
			};
			for value in values.into_iter().filter(|v| !v.is_null()) {
				let name = &mapping.name;
				match &mapping.kind {
					FieldKind::Text { .. } | FieldKind::Keyword => match value {
						Value::String(s) => doc.add_text(*field, s),
						Value::Number(_) | Value::Bool(_) => doc.add_text(*field, value.to_string()),
						_ => return Err(format!("field '{name}' expects a string")),
					},
					FieldKind::Int32 => {
						let v = value.as_i64().filter(|v| i32::try_from(*v).is_ok());
						doc.add_i64(*field, v.ok_or_else(|| format!("field '{name}' expects a 32-bit integer"))?);
					}
					FieldKind::Int64 => {
						doc.add_i64(*field, value.as_i64().ok_or_else(|| format!("field '{name}' expects an integer"))?);
					}
					FieldKind::Date => {
						doc.add_date(*field, date_value(value).ok_or_else(|| format!("field '{name}' expects a date"))?);
					}
				}
			}
		}
		Ok(doc)
	}
}

/// RFC 3339 strings or epoch milliseconds.
pub(crate) fn date_value(value: &Value) -> Option<DateTime> {
	match value {
		Value::String(s) => parse_date(s),
		Value::Number(n) => n.as_i64().map(DateTime::from_timestamp_millis),
		_ => None,
	}
}

pub(crate) fn parse_date(s: &str) -> Option<DateTime> {
	ChronoDateTime::parse_from_rfc3339(s).ok().map(|dt| DateTime::from_timestamp_micros(dt.timestamp_micros()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use docindex_core::DocumentKey;

	fn note(id: &str, title: &str) -> BulkItem {
		BulkItem { id: DocumentKey::from(id).normalize(), source: json!({ "id": id, "title": title }) }
	}

	#[test]
	fn failed_commit_leaves_nothing_staged() {
		let mapping = IndexMapping::builder().key("id").text("title").build().unwrap();
		let collection = Collection::create("notes", &mapping, None).unwrap();

		let failed = collection.write_with(vec![note("lost", "never committed")], |_| Err(Error::engine_response("disk full")));
		assert!(matches!(failed, Err(Error::EngineResponse { .. })));

		collection.write(vec![note("kept", "committed later")]).unwrap();
		assert!(collection.get("kept").unwrap().is_some());
		assert!(collection.get("lost").unwrap().is_none());
		assert_eq!(collection.doc_count(), 1);
	}
}
