use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::mapping::{Document, IndexMapping};
use crate::operations::WriteOperations;
use crate::query::NativeQuery;
use crate::types::IndexStats;
use crate::wire::{BulkItem, BulkResponse, EngineGetResponse, EngineSearchResponse, GetTarget};

/// A connection to the search engine, shared by every operation.
///
/// Implementations must be safe for concurrent use. A missing index is
/// reported as an `EngineResponse` error with status 404.
#[async_trait]
pub trait EngineClient: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;
    async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<()>;
    /// Returns false when there was nothing to delete.
    async fn delete_index(&self, index: &str) -> Result<bool>;
    async fn bulk_index(&self, index: &str, items: Vec<BulkItem>) -> Result<BulkResponse>;
    async fn multi_get(&self, targets: &[GetTarget]) -> Result<EngineGetResponse>;
    async fn search(&self, query: &NativeQuery) -> Result<EngineSearchResponse>;
    async fn index_stats(&self, index: &str) -> Result<IndexStats>;
}

/// Builds a configured engine client.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create_client(&self) -> Result<Arc<dyn EngineClient>>;
}

/// Hands out a ready-to-use client. Whether it was built eagerly or on first
/// use is up to the implementation.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    async fn client(&self, cancel: &CancellationToken) -> Result<Arc<dyn EngineClient>>;
}

/// Fills a freshly created index during `regenerate`.
#[async_trait]
pub trait Populator<T: Document>: Send + Sync {
    async fn populate(&self, writer: &WriteOperations<T>, cancel: &CancellationToken) -> Result<()>;
}
