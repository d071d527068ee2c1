//! Persistent embedding index, one collection per policy

mod store;

pub use store::{EmbeddingIndex, EmbeddingRecord, PolicyStats, SearchResult};
