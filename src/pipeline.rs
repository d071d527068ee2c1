//! Single-document processing pipeline: extract, chunk, embed, store

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BatchConfig, ChunkingConfig, IngestionConfig};
use crate::error::{Error, Result};
use crate::index::EmbeddingIndex;
use crate::ingestion::{DocumentIngester, TextChunker};
use crate::storage::{PolicyRecord, PolicyRegistry};
use crate::types::Chunk;

/// Statistics for one processed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    pub policy_name: String,
    pub filename: String,
    pub total_pages: Option<u32>,
    pub ocr_pages: u32,
    pub chunk_count: u32,
    /// True when the file content was unchanged and indexing was skipped
    pub unchanged: bool,
}

/// Drives one document through extraction, chunking, and indexing
pub struct PolicyPipeline {
    ingester: Arc<DocumentIngester>,
    chunker: TextChunker,
    index: Arc<EmbeddingIndex>,
    registry: Arc<PolicyRegistry>,
    index_retries: u32,
}

impl PolicyPipeline {
    /// Create a pipeline over shared index and registry handles
    pub fn new(
        ingestion: IngestionConfig,
        chunking: &ChunkingConfig,
        batch: &BatchConfig,
        index: Arc<EmbeddingIndex>,
        registry: Arc<PolicyRegistry>,
    ) -> Self {
        Self {
            ingester: Arc::new(DocumentIngester::new(ingestion)),
            chunker: TextChunker::new(chunking),
            index,
            registry,
            index_retries: batch.index_retries,
        }
    }

    /// The ingester, for callers that only need text extraction
    pub fn ingester(&self) -> &Arc<DocumentIngester> {
        &self.ingester
    }

    /// Process one document end to end. Re-processing an unchanged file is a
    /// cheap no-op detected by content hash.
    pub async fn process_document(&self, path: &Path, policy_name: &str) -> Result<IngestStats> {
        let path_owned = path.to_path_buf();
        let ingester = Arc::clone(&self.ingester);

        // Extraction is blocking CPU/IO work
        let extracted = tokio::task::spawn_blocking(move || ingester.extract(&path_owned))
            .await
            .map_err(|e| Error::Internal(format!("extraction task failed: {}", e)))??;

        if let Some(existing) = self.registry.find(policy_name)? {
            if existing.content_hash == extracted.content_hash {
                tracing::info!("policy '{}' unchanged, skipping indexing", policy_name);
                return Ok(IngestStats {
                    policy_name: policy_name.to_string(),
                    filename: extracted.filename,
                    total_pages: extracted.total_pages,
                    ocr_pages: extracted.ocr_pages,
                    chunk_count: existing.chunk_count,
                    unchanged: true,
                });
            }
        }

        let chunks = self.chunker.chunk(policy_name, &extracted);
        if chunks.is_empty() {
            return Err(Error::extraction(
                &extracted.filename,
                "document produced no indexable chunks",
            ));
        }
        tracing::info!("created {} chunks for policy '{}'", chunks.len(), policy_name);

        self.upsert_with_retry(policy_name, &chunks).await?;

        let stats = IngestStats {
            policy_name: policy_name.to_string(),
            filename: extracted.filename.clone(),
            total_pages: extracted.total_pages,
            ocr_pages: extracted.ocr_pages,
            chunk_count: chunks.len() as u32,
            unchanged: false,
        };

        self.registry.record(&PolicyRecord {
            policy_name: stats.policy_name.clone(),
            filename: extracted.filename,
            file_type: extracted.file_type,
            content_hash: extracted.content_hash,
            total_pages: extracted.total_pages,
            ocr_pages: extracted.ocr_pages,
            chunk_count: stats.chunk_count,
            ingested_at: chrono::Utc::now(),
        })?;

        Ok(stats)
    }

    /// Index writes are retried a bounded number of times before the file is
    /// given up on; upserts are idempotent so a retry never duplicates.
    async fn upsert_with_retry(&self, policy_name: &str, chunks: &[Chunk]) -> Result<()> {
        let mut last_err = None;
        for attempt in 0..=self.index_retries {
            if attempt > 0 {
                tracing::warn!(
                    "retrying index write for policy '{}' (attempt {})",
                    policy_name,
                    attempt + 1
                );
                tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
            }
            match self.index.upsert(policy_name, chunks).await {
                Ok(_) => return Ok(()),
                Err(e @ Error::Indexing(_)) => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Indexing("index write failed".into())))
    }
}
