#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! docindex-core
//!
//! Engine-agnostic document indices: typed search, point lookup and bulk
//! writes over any [`traits::EngineClient`]. Requests are translated into a
//! boolean [`query::NativeQuery`], and engine answers are mapped back into
//! [`types::SearchResponse`] with highlight offsets recovered from
//! marker-wrapped text (see [`highlight`]).

pub mod config;
pub mod error;
pub mod highlight;
pub mod index;
pub mod key;
pub mod manager;
pub mod mapping;
pub mod operations;
pub mod provider;
pub mod query;
pub mod response;
pub mod traits;
pub mod types;
pub mod wire;

pub use error::{Error, Result};
pub use index::Index;
pub use key::{DocumentKey, EngineKey};
pub use manager::IndexManager;
pub use mapping::{Document, IndexMapping};
pub use operations::{ReadOperations, WriteOperations};
pub use types::{
    Filter, FilterValue, GetRequest, GetResponse, HighlightOffset, Hit, SearchRequest, SearchResponse,
};
