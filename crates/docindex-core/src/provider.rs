use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::traits::{ClientFactory, ClientProvider, EngineClient};

/// Run `fut` unless `cancel` fires first.
pub async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

/// A provider over one client built up front.
#[derive(Clone)]
pub struct SharedClient {
    client: Arc<dyn EngineClient>,
}

impl SharedClient {
    pub fn new(client: Arc<dyn EngineClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClientProvider for SharedClient {
    async fn client(&self, cancel: &CancellationToken) -> Result<Arc<dyn EngineClient>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(Arc::clone(&self.client))
    }
}

/// A provider that asks its factory for a client on first use and shares it
/// afterwards. A failed or cancelled construction is retried on the next call.
pub struct LazyClient<F> {
    factory: F,
    cell: OnceCell<Arc<dyn EngineClient>>,
}

impl<F: ClientFactory> LazyClient<F> {
    pub fn new(factory: F) -> Self {
        Self { factory, cell: OnceCell::new() }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl<F: ClientFactory> ClientProvider for LazyClient<F> {
    async fn client(&self, cancel: &CancellationToken) -> Result<Arc<dyn EngineClient>> {
        let init = async {
            let client = self.cell.get_or_try_init(|| self.factory.create_client()).await?;
            Ok(Arc::clone(client))
        };
        cancellable(cancel, init).await
    }
}
