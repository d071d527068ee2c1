//! Core types for the policy RAG pipeline

pub mod document;
pub mod report;
pub mod response;

pub use document::{Chunk, ChunkSource, ExtractedDocument, FileType, PageText};
pub use report::{
    BatchReport, BatchSummary, ComparisonCell, ComparisonRow, ComparisonTable,
    EligibilityStatus, EligibilitySummary, EligibilityVerdict, FileOutcome,
};
pub use response::{Answer, Citation};
