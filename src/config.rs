//! Configuration for the policy RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyRagConfig {
    /// Text chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Generative model (Ollama) configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Index storage configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Document ingestion configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// Batch processing configuration
    #[serde(default)]
    pub batch: BatchConfig,
}

impl PolicyRagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration at startup
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than zero".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return Err(Error::InvalidConfig(
                "similarity_threshold must be within [0.0, 1.0]".into(),
            ));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::InvalidConfig("embedding dimensions must be at least 1".into()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding batch_size must be at least 1".into()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::InvalidConfig("llm timeout_secs must be at least 1".into()));
        }
        if self.batch.file_timeout_secs == 0 {
            return Err(Error::InvalidConfig("batch file_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters
    pub chunk_overlap: usize,
    /// Minimum size for a trailing chunk (smaller remainders are dropped)
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
            min_chunk_size: 100,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model name (served by Ollama)
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            batch_size: 32,
        }
    }
}

/// Generative model (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate per answer
    pub num_predict: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3".to_string(),
            temperature: 0.1, // low for factual answers
            num_predict: 500,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve per question
    pub top_k: usize,
    /// Minimum similarity for a chunk to be used (0.0-1.0)
    pub similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.2,
        }
    }
}

/// Index storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding per-policy collection files
    pub data_dir: PathBuf,
    /// Path to the SQLite policy registry
    pub registry_path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("policy-rag");
        Self {
            data_dir: base.join("index"),
            registry_path: base.join("registry.db"),
        }
    }
}

/// Document ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Run OCR on pages with no extractable text
    pub use_ocr: bool,
    /// Render resolution for OCR page images
    pub ocr_dpi: u32,
    /// Convert legacy .doc files with headless LibreOffice
    pub use_libreoffice: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            use_ocr: true,
            ocr_dpi: 150,
            use_libreoffice: true,
        }
    }
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of files processed in parallel (default: CPU count, max 8)
    pub parallel_files: Option<usize>,
    /// Timeout for processing a single file in seconds
    pub file_timeout_secs: u64,
    /// Retries for index write failures before recording a file failure
    pub index_retries: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel_files: None,
            file_timeout_secs: 300,
            index_retries: 2,
        }
    }
}
