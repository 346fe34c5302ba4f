use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::mapping::{Document, IndexMapping};
use crate::operations::{IndexHandle, ReadOperations, WriteOperations};
use crate::provider::cancellable;
use crate::traits::{ClientProvider, Populator};
use crate::types::IndexStats;

/// One engine collection holding documents of type `T`.
///
/// The index owns nothing but its name, mapping and the means to reach the
/// engine; it is only ever destroyed by an explicit call.
pub struct Index<T: Document> {
    handle: IndexHandle,
    populator: Option<Arc<dyn Populator<T>>>,
    _doc: PhantomData<fn() -> T>,
}

impl<T: Document> Clone for Index<T> {
    fn clone(&self) -> Self {
        Self { handle: self.handle.clone(), populator: self.populator.clone(), _doc: PhantomData }
    }
}

impl<T: Document> Index<T> {
    /// Uses `T::index_name()` and `T::mapping()`; a bad mapping fails here,
    /// not at query time.
    pub fn new(provider: Arc<dyn ClientProvider>) -> Result<Self> {
        Self::with_name(T::index_name(), provider)
    }

    pub fn with_name(name: impl Into<String>, provider: Arc<dyn ClientProvider>) -> Result<Self> {
        let mapping = T::mapping()?;
        let handle = IndexHandle { name: name.into(), mapping: Arc::new(mapping), provider };
        Ok(Self { handle, populator: None, _doc: PhantomData })
    }

    pub fn with_populator(mut self, populator: Arc<dyn Populator<T>>) -> Self {
        self.populator = Some(populator);
        self
    }

    pub fn name(&self) -> &str {
        &self.handle.name
    }

    pub fn mapping(&self) -> &IndexMapping {
        &self.handle.mapping
    }

    pub fn read_operations(&self) -> ReadOperations<T> {
        ReadOperations::new(self.handle.clone())
    }

    pub fn write_operations(&self) -> WriteOperations<T> {
        WriteOperations::new(self.handle.clone())
    }

    pub async fn exists(&self, cancel: &CancellationToken) -> Result<bool> {
        let client = self.handle.client(cancel).await?;
        match cancellable(cancel, client.index_exists(&self.handle.name)).await {
            Err(e) if e.is_not_found() => Ok(false),
            other => other,
        }
    }

    pub async fn create(&self, cancel: &CancellationToken) -> Result<()> {
        let client = self.handle.client(cancel).await?;
        cancellable(cancel, client.create_index(&self.handle.name, &self.handle.mapping)).await?;
        tracing::info!(index = %self.handle.name, "index created");
        Ok(())
    }

    /// Delete the index. Deleting an index that does not exist is a no-op.
    pub async fn destroy(&self, cancel: &CancellationToken) -> Result<()> {
        let client = self.handle.client(cancel).await?;
        let deleted = match cancellable(cancel, client.delete_index(&self.handle.name)).await {
            Err(e) if e.is_not_found() => false,
            other => other?,
        };
        tracing::info!(index = %self.handle.name, deleted, "index destroyed");
        Ok(())
    }

    /// Destroy, create and populate, in that order. A failure part way
    /// through is returned as is; nothing is rolled back.
    pub async fn regenerate(&self, cancel: &CancellationToken) -> Result<()> {
        self.destroy(cancel).await?;
        self.create(cancel).await?;
        if let Some(populator) = &self.populator {
            populator.populate(&self.write_operations(), cancel).await?;
            tracing::info!(index = %self.handle.name, "index populated");
        }
        Ok(())
    }

    pub async fn stats(&self, cancel: &CancellationToken) -> Result<IndexStats> {
        let client = self.handle.client(cancel).await?;
        cancellable(cancel, client.index_stats(&self.handle.name)).await
    }
}
