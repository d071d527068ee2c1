//! Error types for the policy RAG pipeline

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// File extension is not one of the supported document formats
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// No text could be recovered from a document, even with OCR
    #[error("extraction failed for {filename}: {reason}")]
    Extraction { filename: String, reason: String },

    /// Embedding or index write failure (retryable a bounded number of times)
    #[error("indexing error: {0}")]
    Indexing(String),

    /// Query-time index failure
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Generative model call failed or timed out. Distinct from an
    /// insufficient-information answer, which is a successful result.
    #[error("generation error: {0}")]
    Generation(String),

    /// The local model endpoint could not be reached at all
    #[error("model endpoint unavailable: {0}")]
    LlmUnavailable(String),

    /// Configuration rejected at startup validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Registry database failure
    #[error("registry error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Extraction failure for a named file
    pub fn extraction(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
