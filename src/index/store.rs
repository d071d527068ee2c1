//! On-disk embedding index keyed by policy name
//!
//! Each policy gets its own collection file so queries can be scoped to one
//! or many policies and a re-ingested policy never bleeds into its siblings.
//! Upserts overwrite records by chunk id, which together with derived chunk
//! ids makes re-indexing idempotent. Writes to one policy are serialized by a
//! per-policy lock; different policies may write concurrently, and readers
//! are never blocked by writers of other policies.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::document::{slugify, Chunk};

/// One stored embedding: vector plus a metadata copy of the chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Embedding vector
    pub vector: Vec<f32>,
    /// The chunk this vector was computed from
    pub chunk: Chunk,
}

/// Collection manifest, checked against the configured embedding model so a
/// model switch between index-build time and query time is detected instead
/// of silently producing garbage similarities.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionManifest {
    embedding_model: String,
    dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionFile {
    policy_name: String,
    manifest: CollectionManifest,
    records: Vec<EmbeddingRecord>,
}

struct Collection {
    policy_name: String,
    manifest: CollectionManifest,
    records: Vec<EmbeddingRecord>,
    by_chunk_id: HashMap<String, usize>,
}

impl Collection {
    fn new(policy_name: String, manifest: CollectionManifest) -> Self {
        Self {
            policy_name,
            manifest,
            records: Vec::new(),
            by_chunk_id: HashMap::new(),
        }
    }

    fn from_file(file: CollectionFile) -> Self {
        let mut collection = Self::new(file.policy_name, file.manifest);
        for record in file.records {
            collection.upsert_record(record);
        }
        collection
    }

    fn upsert_record(&mut self, record: EmbeddingRecord) {
        match self.by_chunk_id.get(&record.chunk.id) {
            Some(&i) => self.records[i] = record,
            None => {
                self.by_chunk_id.insert(record.chunk.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    fn to_file(&self) -> CollectionFile {
        CollectionFile {
            policy_name: self.policy_name.clone(),
            manifest: self.manifest.clone(),
            records: self.records.clone(),
        }
    }
}

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (0.0-1.0, higher is better)
    pub similarity: f32,
}

/// An indexed policy with its chunk count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyStats {
    pub policy_name: String,
    pub chunk_count: usize,
}

/// Persistent embedding index over per-policy collections
pub struct EmbeddingIndex {
    data_dir: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    collections: RwLock<HashMap<String, Collection>>,
    // Serializes writes per policy without blocking other policies
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl EmbeddingIndex {
    /// Open the index at `data_dir`, loading any persisted collections
    pub fn open(data_dir: &Path, embedder: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;

        let mut collections = HashMap::new();
        for entry in std::fs::read_dir(data_dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let raw = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<CollectionFile>(&raw) {
                Ok(file) => {
                    let collection = Collection::from_file(file);
                    tracing::debug!(
                        "loaded collection '{}' ({} chunks)",
                        collection.policy_name,
                        collection.records.len()
                    );
                    collections.insert(collection.policy_name.clone(), collection);
                }
                Err(e) => {
                    tracing::warn!("skipping unreadable collection file {}: {}", path.display(), e);
                }
            }
        }

        tracing::info!("embedding index open with {} policies", collections.len());

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            embedder,
            batch_size: batch_size.max(1),
            collections: RwLock::new(collections),
            write_locks: DashMap::new(),
        })
    }

    fn collection_path(&self, policy_name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", slugify(policy_name)))
    }

    fn write_lock(&self, policy_name: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(policy_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn check_manifest(&self, manifest: &CollectionManifest, policy_name: &str) -> Result<()> {
        if manifest.embedding_model != self.embedder.model()
            || manifest.dimensions != self.embedder.dimensions()
        {
            return Err(Error::Indexing(format!(
                "collection '{}' was built with {} ({} dims) but the configured model is {} ({} dims); re-ingest the policy",
                policy_name,
                manifest.embedding_model,
                manifest.dimensions,
                self.embedder.model(),
                self.embedder.dimensions()
            )));
        }
        Ok(())
    }

    /// Embed and store chunks for a policy. Re-running with the same chunk
    /// ids overwrites in place rather than duplicating.
    pub async fn upsert(&self, policy_name: &str, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let lock = self.write_lock(policy_name);
        let _guard = lock.lock().await;

        // Existing collection must have been built with the same model
        {
            let collections = self.collections.read();
            if let Some(collection) = collections.get(policy_name) {
                self.check_manifest(&collection.manifest, policy_name)?;
            }
        }

        // Embed in batches before taking the map lock; model calls dominate
        // latency and must not serialize readers.
        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self
                .embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| Error::Indexing(format!("embedding failed: {}", e)))?;
            if vectors.len() != batch.len() {
                return Err(Error::Indexing(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                records.push(EmbeddingRecord {
                    vector,
                    chunk: chunk.clone(),
                });
            }
        }

        let snapshot = {
            let mut collections = self.collections.write();
            let collection = collections.entry(policy_name.to_string()).or_insert_with(|| {
                Collection::new(
                    policy_name.to_string(),
                    CollectionManifest {
                        embedding_model: self.embedder.model().to_string(),
                        dimensions: self.embedder.dimensions(),
                    },
                )
            });
            for record in records {
                collection.upsert_record(record);
            }
            collection.to_file()
        };

        let written = snapshot.records.len();
        self.persist(policy_name, &snapshot)?;
        tracing::info!("indexed {} chunks for policy '{}' ({} total)", chunks.len(), policy_name, written);
        Ok(chunks.len())
    }

    /// Atomically replace the collection file (write temp, then rename)
    fn persist(&self, policy_name: &str, snapshot: &CollectionFile) -> Result<()> {
        let path = self.collection_path(policy_name);
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_string(snapshot)?;
        std::fs::write(&tmp, raw).map_err(|e| Error::Indexing(format!("failed to write collection: {}", e)))?;
        std::fs::rename(&tmp, &path).map_err(|e| Error::Indexing(format!("failed to commit collection: {}", e)))?;
        Ok(())
    }

    /// Find the `top_k` most similar chunks for a question, scoped to the
    /// given policies (or all policies when `scope` is `None`). An empty or
    /// unknown scope yields an empty result, not an error.
    pub async fn query(
        &self,
        question: &str,
        scope: Option<&[String]>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| Error::Retrieval(format!("failed to embed question: {}", e)))?;

        let collections = self.collections.read();
        let mut results: Vec<SearchResult> = Vec::new();

        for (name, collection) in collections.iter() {
            if let Some(scope) = scope {
                if !scope.iter().any(|s| s == name) {
                    continue;
                }
            }
            self.check_manifest(&collection.manifest, name)
                .map_err(|e| Error::Retrieval(e.to_string()))?;

            for record in &collection.records {
                let similarity = cosine_similarity(&query_vector, &record.vector);
                results.push(SearchResult {
                    chunk: record.chunk.clone(),
                    similarity,
                });
            }
        }

        // Deterministic for a fixed index state: ties break on chunk id
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        results.truncate(top_k);
        Ok(results)
    }

    /// All indexed policy names with their chunk counts, sorted by name
    pub fn list_policies(&self) -> Vec<PolicyStats> {
        let collections = self.collections.read();
        let mut stats: Vec<PolicyStats> = collections
            .values()
            .map(|c| PolicyStats {
                policy_name: c.policy_name.clone(),
                chunk_count: c.records.len(),
            })
            .collect();
        stats.sort_by(|a, b| a.policy_name.cmp(&b.policy_name));
        stats
    }

    /// Chunk count for one policy (0 when absent)
    pub fn chunk_count(&self, policy_name: &str) -> usize {
        self.collections
            .read()
            .get(policy_name)
            .map(|c| c.records.len())
            .unwrap_or(0)
    }

    /// Remove a policy's collection from memory and disk
    pub async fn delete_policy(&self, policy_name: &str) -> Result<bool> {
        let lock = self.write_lock(policy_name);
        let _guard = lock.lock().await;

        let existed = self.collections.write().remove(policy_name).is_some();
        let path = self.collection_path(policy_name);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(existed)
    }
}

/// Cosine similarity mapped into [0, 1]
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    (cosine + 1.0) / 2.0
}
