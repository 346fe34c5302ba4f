use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use docindex_core::config::EngineConfig;
use docindex_core::mapping::IndexMapping;
use docindex_core::query::NativeQuery;
use docindex_core::traits::{ClientFactory, EngineClient};
use docindex_core::types::IndexStats;
use docindex_core::wire::{BulkItem, BulkResponse, EngineGetResponse, EngineSearchResponse, GetTarget};
use docindex_core::{Error, Result};

use crate::{dsl, wire};

/// An [`EngineClient`] speaking the Elasticsearch REST API.
pub struct ElasticClient {
    http: Client,
    base: String,
}

impl ElasticClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let base = config.url.trim().trim_end_matches('/').to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!("'{}' is not an http(s) url", config.url)));
        }
        let http = Client::builder()
            .gzip(config.enable_compression)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::communication("building http client", e))?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(|e| Error::communication("request to engine failed", e))
    }

    /// The response body of a 2xx answer; anything else becomes `EngineResponse`.
    async fn body(&self, response: Response) -> Result<String> {
        let status = response.status();
        let text = response.text().await.map_err(|e| Error::communication("reading engine response", e))?;
        if !status.is_success() {
            return Err(Error::engine_status(status.as_u16(), wire::error_reason(&text)));
        }
        Ok(text)
    }
}

#[async_trait]
impl EngineClient for ElasticClient {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self.send(self.http.head(self.url(index))).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(Error::engine_status(s.as_u16(), format!("index exists check for [{index}] failed"))),
        }
    }

    async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<()> {
        let response = self.send(self.http.put(self.url(index)).json(&dsl::mapping_body(mapping))).await?;
        self.body(response).await?;
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<bool> {
        let response = self.send(self.http.delete(self.url(index))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        self.body(response).await?;
        Ok(true)
    }

    async fn bulk_index(&self, index: &str, items: Vec<BulkItem>) -> Result<BulkResponse> {
        let body = dsl::bulk_body(index, &items)?;
        let request = self
            .http
            .post(self.url("_bulk?refresh=wait_for"))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        let text = self.body(self.send(request).await?).await?;
        let response = wire::parse_bulk(&text)?;
        tracing::debug!(index, items = response.items.len(), "bulk request completed");
        Ok(response)
    }

    async fn multi_get(&self, targets: &[GetTarget]) -> Result<EngineGetResponse> {
        let request = self.http.post(self.url("_mget")).json(&dsl::mget_body(targets));
        let text = self.body(self.send(request).await?).await?;
        wire::parse_mget(&text)
    }

    async fn search(&self, query: &NativeQuery) -> Result<EngineSearchResponse> {
        let body = dsl::search_body(query)?;
        tracing::debug!(index = %query.index, body = %body, "search request");
        let request = self.http.post(self.url(&format!("{}/_search", query.index))).json(&body);
        let text = self.body(self.send(request).await?).await?;
        wire::parse_search(&text)
    }

    async fn index_stats(&self, index: &str) -> Result<IndexStats> {
        let request = self.http.get(self.url(&format!("{index}/_stats")));
        let text = self.body(self.send(request).await?).await?;
        wire::parse_stats(&text)
    }
}

/// Builds an [`ElasticClient`] from the `engine` config section.
pub struct ElasticClientFactory {
    config: EngineConfig,
}

impl ElasticClientFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClientFactory for ElasticClientFactory {
    async fn create_client(&self) -> Result<Arc<dyn EngineClient>> {
        let client = ElasticClient::new(&self.config)?;
        tracing::info!(url = %client.base_url(), compression = self.config.enable_compression, "elasticsearch client ready");
        Ok(Arc::new(client))
    }
}
