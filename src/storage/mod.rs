//! Durable bookkeeping for ingested policies

mod registry;

pub use registry::{PolicyRecord, PolicyRegistry};
