//! Engine-level payloads exchanged through [`crate::traits::EngineClient`].
//!
//! Sources travel as `serde_json::Value` so the client trait stays object
//! safe; typed mapping happens in [`crate::response`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::key::EngineKey;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineSearchResponse {
    pub total: u64,
    pub max_score: Option<f64>,
    pub hits: Vec<EngineHit>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineHit {
    pub index: String,
    pub id: String,
    pub score: Option<f64>,
    pub source: Option<serde_json::Value>,
    /// Field name to highlighted fragments.
    #[serde(default)]
    pub highlight: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTarget {
    pub index: String,
    pub id: EngineKey,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineGetResponse {
    pub docs: Vec<EngineGetHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineGetHit {
    pub index: String,
    pub id: String,
    pub found: bool,
    pub source: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItem {
    pub id: EngineKey,
    pub source: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkResponse {
    pub items: Vec<BulkItemOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemOutcome {
    pub id: String,
    /// The engine's error payload for this document, if it failed.
    pub error: Option<serde_json::Value>,
}

impl BulkResponse {
    pub fn failures(&self) -> impl Iterator<Item = &BulkItemOutcome> {
        self.items.iter().filter(|i| i.error.is_some())
    }
}
