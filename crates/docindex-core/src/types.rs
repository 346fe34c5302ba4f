//! Engine-neutral request and response types.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::key::DocumentKey;

/// A scalar the engine can compare a field against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    String(String),
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::String(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::String(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Integer(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Integer(i64::from(v))
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Boolean(v)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(v)
    }
}

/// A mandatory, non-scoring constraint on one field.
///
/// An empty `operation` means equality. `lt`, `lte`, `gt` and `gte` bound the
/// field on one side with `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    #[serde(default)]
    pub operation: String,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, operation: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self { field: field.into(), operation: operation.into(), value: value.into() }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, "", value)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default)]
    pub take: Option<i64>,
    #[serde(default)]
    pub minimum_score: Option<Decimal>,
    #[serde(default)]
    pub highlight: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default() }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = skip;
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn minimum_score(mut self, score: Decimal) -> Self {
        self.minimum_score = Some(score);
        self
    }

    pub fn highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    /// Reject requests the translator cannot turn into a query: negative
    /// paging, a non-positive page size, blank filter fields, or no query
    /// text with nothing else to constrain the result.
    pub fn validate(&self) -> Result<()> {
        if self.skip < 0 {
            return Err(Error::validation(format!("skip must not be negative, got {}", self.skip)));
        }
        if let Some(take) = self.take {
            if take <= 0 {
                return Err(Error::validation(format!("take must be positive, got {take}")));
            }
        }
        if let Some(score) = self.minimum_score {
            if score.is_sign_negative() {
                return Err(Error::validation(format!("minimum score must not be negative, got {score}")));
            }
        }
        if self.query.trim().is_empty() && self.filters.is_empty() {
            return Err(Error::validation("query text is required when no filters are given"));
        }
        if let Some(f) = self.filters.iter().find(|f| f.field.trim().is_empty()) {
            return Err(Error::validation(format!("filter on value {:?} has an empty field name", f.value)));
        }
        Ok(())
    }
}

/// A highlighted span in the original field text, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightOffset {
    pub offset: usize,
    pub length: usize,
}

impl HighlightOffset {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit<T> {
    pub item: Option<T>,
    pub score: Option<Decimal>,
    pub id: String,
    pub index: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub highlights: BTreeMap<String, Vec<HighlightOffset>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    pub request: SearchRequest,
    pub total_hits: u64,
    pub maximum_score: Option<Decimal>,
    pub hits: Vec<Hit<T>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetRequest {
    pub ids: Vec<DocumentKey>,
}

impl GetRequest {
    pub fn new<I, K>(ids: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<DocumentKey>,
    {
        Self { ids: ids.into_iter().map(Into::into).collect() }
    }
}

/// Hits come back in engine order, which need not match `request.ids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetResponse<T> {
    pub request: GetRequest,
    pub total_hits: u64,
    pub hits: Vec<Hit<T>>,
}

/// Keys grouped by the index that holds them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MultiIndexGetRequest {
    pub ids: BTreeMap<String, Vec<DocumentKey>>,
}

impl MultiIndexGetRequest {
    pub fn add(mut self, index: impl Into<String>, key: impl Into<DocumentKey>) -> Self {
        self.ids.entry(index.into()).or_default().push(key.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiIndexGetResponse {
    pub request: MultiIndexGetRequest,
    pub total_hits: u64,
    pub hits: Vec<Hit<serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: u64,
    /// On-disk footprint, when the engine can report one.
    pub size_in_bytes: Option<u64>,
}

/// Widen an engine score to a fixed-point decimal. Non-finite scores have no
/// decimal form and are dropped.
pub fn score_to_decimal(score: f64) -> Option<Decimal> {
    Decimal::from_f64(score)
}
