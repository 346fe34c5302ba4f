//! docindex-elastic
//!
//! HTTP engine for docindex-core, speaking the Elasticsearch REST API.
pub mod client;
pub mod dsl;
pub mod wire;

pub use client::{ElasticClient, ElasticClientFactory};
