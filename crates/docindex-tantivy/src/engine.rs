//! [`EngineClient`] over embedded tantivy collections.
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use docindex_core::config::{expand_path, EngineConfig};
use docindex_core::mapping::IndexMapping;
use docindex_core::query::NativeQuery;
use docindex_core::traits::{ClientFactory, EngineClient};
use docindex_core::types::IndexStats;
use docindex_core::wire::{BulkItem, BulkResponse, EngineGetHit, EngineGetResponse, EngineSearchResponse, GetTarget};
use docindex_core::{Error, Result};

use crate::index::{engine_error, Collection};
use crate::search;

pub const MEMORY_URL: &str = "memory://";

/// Collections live in RAM, or each in its own directory under `root`.
pub struct TantivyEngine {
	root: Option<PathBuf>,
	collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl TantivyEngine {
	pub fn in_memory() -> Self {
		Self { root: None, collections: RwLock::new(HashMap::new()) }
	}

	/// Persist collections under `root`, creating it when missing. Existing
	/// collections are opened on first use.
	pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
		let root = root.into();
		std::fs::create_dir_all(&root).map_err(|e| engine_error("creating engine root", e))?;
		Ok(Self { root: Some(root), collections: RwLock::new(HashMap::new()) })
	}

	/// `memory://`, `file://<path>` or a bare path (with `~` and `$VAR` expansion).
	pub fn from_url(url: &str) -> Result<Self> {
		let url = url.trim();
		if url == MEMORY_URL {
			return Ok(Self::in_memory());
		}
		let path = url.strip_prefix("file://").unwrap_or(url);
		if path.is_empty() || path.contains("://") {
			return Err(Error::InvalidConfig(format!("'{url}' is not a memory:// url or a directory")));
		}
		Self::open(expand_path(path))
	}

	fn collection_dir(&self, index: &str) -> Result<Option<PathBuf>> {
		if index.is_empty() || index.starts_with('.') || index.contains(['/', '\\']) {
			return Err(Error::engine_status(400, format!("invalid index name '{index}'")));
		}
		Ok(self.root.as_ref().map(|root| root.join(index)))
	}

	fn lookup(&self, index: &str) -> Result<Option<Arc<Collection>>> {
		if let Some(c) = self.collections.read().get(index) {
			return Ok(Some(c.clone()));
		}
		let Some(dir) = self.collection_dir(index)? else { return Ok(None) };
		if !dir.is_dir() {
			return Ok(None);
		}
		let mut collections = self.collections.write();
		if let Some(c) = collections.get(index) {
			return Ok(Some(c.clone()));
		}
		let collection = Arc::new(Collection::open(index, &dir)?);
		tracing::debug!(index, dir = %dir.display(), "opened collection");
		collections.insert(index.to_string(), collection.clone());
		Ok(Some(collection))
	}

	fn collection(&self, index: &str) -> Result<Arc<Collection>> {
		self.lookup(index)?.ok_or_else(|| Error::engine_status(404, format!("no such index [{index}]")))
	}
}

/// Run tantivy work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
	F: FnOnce() -> Result<T> + Send + 'static,
	T: Send + 'static,
{
	tokio::task::spawn_blocking(f).await.map_err(|e| Error::communication("engine task failed", e))?
}

#[async_trait]
impl EngineClient for TantivyEngine {
	async fn index_exists(&self, index: &str) -> Result<bool> {
		Ok(self.lookup(index)?.is_some())
	}

	async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<()> {
		let dir = self.collection_dir(index)?;
		if self.lookup(index)?.is_some() {
			return Err(Error::engine_status(400, format!("index [{index}] already exists")));
		}
		let (name, mapping) = (index.to_string(), mapping.clone());
		let collection = blocking(move || Collection::create(&name, &mapping, dir.as_deref())).await?;
		self.collections.write().insert(index.to_string(), Arc::new(collection));
		tracing::info!(index, "created collection");
		Ok(())
	}

	async fn delete_index(&self, index: &str) -> Result<bool> {
		let dir = self.collection_dir(index)?;
		let removed = self.collections.write().remove(index).is_some();
		let on_disk = match dir {
			Some(dir) if dir.is_dir() => {
				std::fs::remove_dir_all(&dir).map_err(|e| engine_error("removing index directory", e))?;
				true
			}
			_ => false,
		};
		Ok(removed || on_disk)
	}

	async fn bulk_index(&self, index: &str, items: Vec<BulkItem>) -> Result<BulkResponse> {
		let collection = self.collection(index)?;
		blocking(move || collection.write(items)).await
	}

	async fn multi_get(&self, targets: &[GetTarget]) -> Result<EngineGetResponse> {
		let resolved = targets
			.iter()
			.map(|t| Ok((self.collection(&t.index)?, t.id.as_str().to_string())))
			.collect::<Result<Vec<_>>>()?;
		blocking(move || {
			let mut docs = Vec::with_capacity(resolved.len());
			for (collection, id) in resolved {
				let source = collection.get(&id)?;
				docs.push(EngineGetHit { index: collection.name().to_string(), id, found: source.is_some(), source });
			}
			Ok(EngineGetResponse { docs })
		})
		.await
	}

	async fn search(&self, query: &NativeQuery) -> Result<EngineSearchResponse> {
		let collection = self.collection(&query.index)?;
		let query = query.clone();
		blocking(move || search::execute(&collection, &query)).await
	}

	async fn index_stats(&self, index: &str) -> Result<IndexStats> {
		let collection = self.collection(index)?;
		blocking(move || Ok(IndexStats { document_count: collection.doc_count(), size_in_bytes: collection.size_in_bytes() })).await
	}
}

/// Builds a [`TantivyEngine`] from the `engine` config section.
/// Compression has no meaning for an embedded engine and is ignored.
pub struct TantivyClientFactory {
	config: EngineConfig,
}

impl TantivyClientFactory {
	pub fn new(config: EngineConfig) -> Self {
		Self { config }
	}
}

#[async_trait]
impl ClientFactory for TantivyClientFactory {
	async fn create_client(&self) -> Result<Arc<dyn EngineClient>> {
		self.config.validate()?;
		let engine = TantivyEngine::from_url(&self.config.url)?;
		tracing::info!(url = %self.config.url, "tantivy engine ready");
		Ok(Arc::new(engine))
	}
}
