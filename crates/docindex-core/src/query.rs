//! Translation of a [`SearchRequest`] into the engine's boolean query.

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::highlight::HighlightMarker;
use crate::mapping::IndexMapping;
use crate::types::{FilterValue, SearchRequest};

/// Page size engines apply when a request sets no `take`.
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeQuery {
    pub index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    pub query: BoolQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HighlightSpec>,
}

/// `should` clauses score the document; `filter` clauses only constrain it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolQuery {
    #[serde(default)]
    pub should: Vec<Clause>,
    #[serde(default)]
    pub filter: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Analyzed free-text match against one field.
    Match { field: String, query: String },
    /// Free-text match against every field.
    QueryString { query: String },
    Term { field: String, value: FilterValue },
    Range { field: String, bounds: RangeBounds },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<FilterValue>,
}

/// Highlight every field, wrapping matches in `marker` on both sides and
/// returning each field whole as a single fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpec {
    pub marker: String,
}

pub fn translate(
    index: &str,
    request: &SearchRequest,
    mapping: &IndexMapping,
    marker: Option<&HighlightMarker>,
) -> Result<NativeQuery> {
    request.validate()?;

    let from = (request.skip > 0).then(|| to_usize(request.skip)).transpose()?;
    let size = request.take.map(to_usize).transpose()?;
    let min_score = match request.minimum_score {
        Some(score) => Some(
            score
                .to_f64()
                .ok_or_else(|| Error::validation(format!("minimum score {score} is out of range")))?,
        ),
        None => None,
    };

    let query = BoolQuery { should: should_clauses(request, mapping), filter: filter_clauses(request)? };
    let highlight = match (request.highlight, marker) {
        (true, Some(marker)) => Some(HighlightSpec { marker: marker.as_str().to_string() }),
        (true, None) => return Err(Error::MissingHighlightMarker),
        (false, _) => None,
    };

    let native = NativeQuery { index: index.to_string(), from, size, min_score, query, highlight };
    tracing::debug!(index, should = native.query.should.len(), filter = native.query.filter.len(), "translated search request");
    Ok(native)
}

fn should_clauses(request: &SearchRequest, mapping: &IndexMapping) -> Vec<Clause> {
    let text = request.query.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let clauses: Vec<Clause> = mapping
        .text_fields()
        .map(|f| Clause::Match { field: f.name.clone(), query: text.to_string() })
        .collect();
    if clauses.is_empty() {
        vec![Clause::QueryString { query: text.to_string() }]
    } else {
        clauses
    }
}

fn filter_clauses(request: &SearchRequest) -> Result<Vec<Clause>> {
    request
        .filters
        .iter()
        .map(|f| {
            let field = f.field.clone();
            let value = Some(f.value.clone());
            let clause = match f.operation.trim().to_ascii_lowercase().as_str() {
                "" => Clause::Term { field, value: f.value.clone() },
                "lt" => Clause::Range { field, bounds: RangeBounds { lt: value, ..RangeBounds::default() } },
                "lte" => Clause::Range { field, bounds: RangeBounds { lte: value, ..RangeBounds::default() } },
                "gt" => Clause::Range { field, bounds: RangeBounds { gt: value, ..RangeBounds::default() } },
                "gte" => Clause::Range { field, bounds: RangeBounds { gte: value, ..RangeBounds::default() } },
                _ => {
                    return Err(Error::UnsupportedFilterOperator { field, operation: f.operation.clone() });
                }
            };
            Ok(clause)
        })
        .collect()
}

fn to_usize(v: i64) -> Result<usize> {
    usize::try_from(v).map_err(|_| Error::validation(format!("paging value {v} is out of range")))
}
