//! policy-rag: retrieval pipeline for insurance policy documents
//!
//! Ingests PDF and Word policy documents (with OCR fallback for scanned
//! pages), splits them into citation-tagged chunks, indexes them in a
//! persistent per-policy embedding store, and answers questions about them
//! with source citations. Country eligibility checks and side-by-side policy
//! comparison are built on the same retrieval substrate, and a batch
//! orchestrator drives whole directories of documents with per-file failure
//! isolation.

pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod index;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod storage;
pub mod types;

pub use analysis::{EligibilityAnalyzer, PolicyComparator};
pub use batch::{BatchAbortHandle, BatchProcessor};
pub use config::PolicyRagConfig;
pub use error::{Error, Result};
pub use index::{EmbeddingIndex, PolicyStats, SearchResult};
pub use ingestion::{DocumentIngester, TextChunker};
pub use pipeline::{IngestStats, PolicyPipeline};
pub use retrieval::QaEngine;
pub use storage::PolicyRegistry;
pub use types::{
    Answer, BatchReport, Chunk, ChunkSource, Citation, ComparisonTable, EligibilityStatus,
    EligibilitySummary, EligibilityVerdict, ExtractedDocument, FileType,
};
