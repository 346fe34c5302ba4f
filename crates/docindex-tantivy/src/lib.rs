//! docindex-tantivy
//!
//! Embedded engine for docindex-core: each index is a tantivy collection held
//! in RAM or under a directory, searched and highlighted in process.
pub mod tantivy_utils;
pub mod index;
pub mod search;
pub mod engine;

pub use engine::{TantivyClientFactory, TantivyEngine};
