//! Read and write façades over one index.
//!
//! Neither keeps state between calls: each call asks the provider for a
//! client, talks to the engine once and returns.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::highlight::HighlightMarker;
use crate::key::{DocumentKey, EngineKey};
use crate::mapping::{Document, IndexMapping};
use crate::provider::cancellable;
use crate::query::translate;
use crate::response::{map_get, map_search};
use crate::traits::{ClientProvider, EngineClient};
use crate::types::{GetRequest, GetResponse, SearchRequest, SearchResponse};
use crate::wire::{BulkItem, GetTarget};

/// What every operation needs: where the documents live, how they are
/// mapped, and how to reach the engine.
#[derive(Clone)]
pub(crate) struct IndexHandle {
    pub(crate) name: String,
    pub(crate) mapping: Arc<IndexMapping>,
    pub(crate) provider: Arc<dyn ClientProvider>,
}

impl IndexHandle {
    pub(crate) async fn client(&self, cancel: &CancellationToken) -> Result<Arc<dyn EngineClient>> {
        self.provider.client(cancel).await
    }
}

pub struct ReadOperations<T> {
    handle: IndexHandle,
    _doc: PhantomData<fn() -> T>,
}

impl<T> Clone for ReadOperations<T> {
    fn clone(&self) -> Self {
        Self { handle: self.handle.clone(), _doc: PhantomData }
    }
}

impl<T: Document> ReadOperations<T> {
    pub(crate) fn new(handle: IndexHandle) -> Self {
        Self { handle, _doc: PhantomData }
    }

    pub fn index_name(&self) -> &str {
        &self.handle.name
    }

    /// The same operations, reaching the engine through another provider.
    pub fn with_provider(&self, provider: Arc<dyn ClientProvider>) -> Self {
        let handle = IndexHandle { provider, ..self.handle.clone() };
        Self::new(handle)
    }

    pub async fn search(&self, request: SearchRequest, cancel: &CancellationToken) -> Result<SearchResponse<T>> {
        request.validate()?;

        let marker = request.highlight.then(HighlightMarker::allocate);
        let query = translate(&self.handle.name, &request, &self.handle.mapping, marker.as_ref())?;

        let client = self.handle.client(cancel).await?;
        let response = cancellable(cancel, client.search(&query)).await?;
        tracing::debug!(index = %self.handle.name, total = response.total, returned = response.hits.len(), "search completed");

        map_search(response, request, marker.as_ref())
    }

    /// Fetch documents by id. Duplicate ids are queried once; the response
    /// order is whatever the engine returns.
    pub async fn get(&self, request: GetRequest, cancel: &CancellationToken) -> Result<GetResponse<T>> {
        let targets = distinct_keys(&request.ids)
            .into_iter()
            .map(|id| GetTarget { index: self.handle.name.clone(), id })
            .collect::<Vec<_>>();
        if targets.is_empty() {
            return Ok(GetResponse { request, total_hits: 0, hits: Vec::new() });
        }

        let client = self.handle.client(cancel).await?;
        let response = cancellable(cancel, client.multi_get(&targets)).await?;
        map_get(response, request)
    }

    /// `Ok(None)` when the document does not exist.
    pub async fn get_one(&self, key: impl Into<DocumentKey>, cancel: &CancellationToken) -> Result<Option<T>> {
        let response = self.get(GetRequest::new([key.into()]), cancel).await?;
        Ok(response.hits.into_iter().find_map(|h| h.item))
    }

    pub async fn get_many<I, K>(&self, keys: I, cancel: &CancellationToken) -> Result<Vec<T>>
    where
        I: IntoIterator<Item = K> + Send,
        K: Into<DocumentKey>,
    {
        let response = self.get(GetRequest::new(keys), cancel).await?;
        Ok(response.hits.into_iter().filter_map(|h| h.item).collect())
    }
}

pub struct WriteOperations<T> {
    handle: IndexHandle,
    _doc: PhantomData<fn() -> T>,
}

impl<T> Clone for WriteOperations<T> {
    fn clone(&self) -> Self {
        Self { handle: self.handle.clone(), _doc: PhantomData }
    }
}

impl<T: Document> WriteOperations<T> {
    pub(crate) fn new(handle: IndexHandle) -> Self {
        Self { handle, _doc: PhantomData }
    }

    pub fn index_name(&self) -> &str {
        &self.handle.name
    }

    pub fn with_provider(&self, provider: Arc<dyn ClientProvider>) -> Self {
        let handle = IndexHandle { provider, ..self.handle.clone() };
        Self::new(handle)
    }

    /// Index or replace `documents` in one batch. Any per-document failure
    /// fails the whole call with [`Error::EngineWrite`].
    pub async fn upsert(&self, documents: &[T], cancel: &CancellationToken) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let items = documents
            .iter()
            .map(|d| bulk_item(d, self.handle.mapping.key_field()))
            .collect::<Result<Vec<_>>>()?;
        let total = items.len();

        let client = self.handle.client(cancel).await?;
        let response = cancellable(cancel, client.bulk_index(&self.handle.name, items)).await?;

        let failures: Vec<serde_json::Value> = response
            .failures()
            .map(|f| serde_json::json!({ "id": f.id, "error": f.error }))
            .collect();
        if !failures.is_empty() {
            tracing::warn!(index = %self.handle.name, failed = failures.len(), total, "bulk write reported failures");
            return Err(Error::EngineWrite { failed: failures.len(), total, detail: serde_json::Value::Array(failures) });
        }
        tracing::debug!(index = %self.handle.name, total, "bulk write completed");
        Ok(())
    }
}

fn bulk_item<T: Document>(document: &T, key_field: &str) -> Result<BulkItem> {
    let source = serde_json::to_value(document)?;
    let key = source
        .get(key_field)
        .ok_or_else(|| Error::mapping(format!("document has no key field '{key_field}'")))?;
    let id = DocumentKey::try_from(key)?.normalize();
    Ok(BulkItem { id, source })
}

pub(crate) fn distinct_keys(keys: &[DocumentKey]) -> Vec<EngineKey> {
    let mut seen = HashSet::new();
    keys.iter().map(DocumentKey::normalize).filter(|k| seen.insert(k.clone())).collect()
}
