//! Lookups that span several indices.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::index::Index;
use crate::mapping::Document;
use crate::operations::distinct_keys;
use crate::provider::cancellable;
use crate::response::map_get_hits;
use crate::traits::ClientProvider;
use crate::types::{MultiIndexGetRequest, MultiIndexGetResponse};
use crate::wire::GetTarget;

pub struct IndexManager {
    provider: Arc<dyn ClientProvider>,
    indices: BTreeSet<String>,
}

impl IndexManager {
    pub fn new(provider: Arc<dyn ClientProvider>) -> Self {
        Self { provider, indices: BTreeSet::new() }
    }

    pub fn register<T: Document>(&mut self, index: &Index<T>) -> &mut Self {
        self.indices.insert(index.name().to_string());
        self
    }

    /// Fetch documents from several indices in one engine round trip. Every
    /// index named in the request must be registered.
    pub async fn multi_index_get(
        &self,
        request: MultiIndexGetRequest,
        cancel: &CancellationToken,
    ) -> Result<MultiIndexGetResponse> {
        let mut targets = Vec::new();
        for (index, keys) in &request.ids {
            if !self.indices.contains(index) {
                return Err(Error::validation(format!("unknown index '{index}'")));
            }
            targets.extend(distinct_keys(keys).into_iter().map(|id| GetTarget { index: index.clone(), id }));
        }
        if targets.is_empty() {
            return Ok(MultiIndexGetResponse { request, total_hits: 0, hits: Vec::new() });
        }

        let client = self.provider.client(cancel).await?;
        let response = cancellable(cancel, client.multi_get(&targets)).await?;
        let hits = map_get_hits(response)?;
        Ok(MultiIndexGetResponse { request, total_hits: hits.len() as u64, hits })
    }
}
