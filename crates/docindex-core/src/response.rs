//! Mapping engine responses back into the neutral result shapes.

use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::highlight::{decode_fragments, HighlightMarker};
use crate::types::{score_to_decimal, GetRequest, GetResponse, HighlightOffset, Hit, SearchRequest, SearchResponse};
use crate::wire::{EngineGetHit, EngineGetResponse, EngineHit, EngineSearchResponse};

/// Hits keep the engine's order. Highlights are decoded only when a marker
/// was used for the query.
pub fn map_search<T: DeserializeOwned>(
    response: EngineSearchResponse,
    request: SearchRequest,
    marker: Option<&HighlightMarker>,
) -> Result<SearchResponse<T>> {
    let hits = response
        .hits
        .into_iter()
        .map(|h| map_hit(h, marker))
        .collect::<Result<Vec<_>>>()?;

    Ok(SearchResponse {
        request,
        total_hits: response.total,
        maximum_score: response.max_score.and_then(score_to_decimal),
        hits,
    })
}

fn map_hit<T: DeserializeOwned>(hit: EngineHit, marker: Option<&HighlightMarker>) -> Result<Hit<T>> {
    let mut highlights = BTreeMap::new();
    if let Some(marker) = marker {
        for (field, fragments) in &hit.highlight {
            let offsets: Vec<HighlightOffset> = decode_fragments(field, fragments, marker.as_str())?;
            if !offsets.is_empty() {
                highlights.insert(field.clone(), offsets);
            }
        }
    }

    Ok(Hit {
        item: deserialize_source(hit.source)?,
        score: hit.score.and_then(score_to_decimal),
        id: hit.id,
        index: hit.index,
        highlights,
    })
}

/// Only found documents become hits; a missing id is simply absent.
pub fn map_get<T: DeserializeOwned>(response: EngineGetResponse, request: GetRequest) -> Result<GetResponse<T>> {
    let hits = map_get_hits(response)?;
    Ok(GetResponse { request, total_hits: hits.len() as u64, hits })
}

pub(crate) fn map_get_hits<T: DeserializeOwned>(response: EngineGetResponse) -> Result<Vec<Hit<T>>> {
    response
        .docs
        .into_iter()
        .filter(|d| d.found)
        .map(|EngineGetHit { index, id, source, .. }| {
            Ok(Hit { item: deserialize_source(source)?, score: None, id, index, highlights: BTreeMap::new() })
        })
        .collect()
}

fn deserialize_source<T: DeserializeOwned>(source: Option<serde_json::Value>) -> Result<Option<T>> {
    match source {
        Some(serde_json::Value::Null) | None => Ok(None),
        Some(v) => Ok(Some(serde_json::from_value(v)?)),
    }
}
