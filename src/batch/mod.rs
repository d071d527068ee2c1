//! Batch processing of a directory of policy documents
//!
//! Each file runs the full ingest pipeline on a bounded worker pool. A bad
//! file is recorded and never aborts its siblings; an aborted batch keeps
//! every chunk already committed. Eligibility checks run only after the
//! ingestion barrier, so they never observe a partially indexed policy.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use walkdir::WalkDir;

use crate::analysis::EligibilityAnalyzer;
use crate::config::BatchConfig;
use crate::error::Result;
use crate::pipeline::PolicyPipeline;
use crate::types::{BatchReport, BatchSummary, FileOutcome};

/// Handle for aborting a running batch
#[derive(Clone)]
pub struct BatchAbortHandle(Arc<AtomicBool>);

impl BatchAbortHandle {
    /// Stop scheduling remaining files. Files already committed keep their
    /// chunks; unstarted files are reported as cancelled.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Processes a directory of policy documents
pub struct BatchProcessor {
    pipeline: Arc<PolicyPipeline>,
    analyzer: Arc<EligibilityAnalyzer>,
    parallel_files: usize,
    file_timeout: Duration,
    cancel: Arc<AtomicBool>,
}

impl BatchProcessor {
    /// Create a batch processor over shared pipeline and analyzer handles
    pub fn new(
        config: &BatchConfig,
        pipeline: Arc<PolicyPipeline>,
        analyzer: Arc<EligibilityAnalyzer>,
    ) -> Self {
        let parallel_files = config
            .parallel_files
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1);
        Self {
            pipeline,
            analyzer,
            parallel_files,
            file_timeout: Duration::from_secs(config.file_timeout_secs),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle that aborts the current run
    pub fn abort_handle(&self) -> BatchAbortHandle {
        BatchAbortHandle(Arc::clone(&self.cancel))
    }

    /// Process every file in a directory, then optionally check country
    /// eligibility for each successfully indexed policy.
    ///
    /// Once aborted, a processor stays aborted: remaining and future files
    /// are reported as cancelled while already-committed chunks are kept.
    pub async fn process_batch(
        &self,
        directory: &Path,
        countries: Option<&[String]>,
    ) -> Result<BatchReport> {
        let files = enumerate_files(directory)?;
        tracing::info!("batch processing {} files from {}", files.len(), directory.display());

        let semaphore = Arc::new(Semaphore::new(self.parallel_files));
        let futures: Vec<_> = files
            .iter()
            .map(|path| {
                let semaphore = Arc::clone(&semaphore);
                let cancel = Arc::clone(&self.cancel);
                let pipeline = Arc::clone(&self.pipeline);
                let path = path.clone();
                let file_timeout = self.file_timeout;

                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore never closes");
                    let file = filename_of(&path);

                    if cancel.load(Ordering::Relaxed) {
                        return FileOutcome::Cancelled { file };
                    }

                    let policy_name = policy_name_from(&path);
                    tracing::info!("processing {} as policy '{}'", file, policy_name);

                    match timeout(file_timeout, pipeline.process_document(&path, &policy_name)).await {
                        Ok(Ok(stats)) if stats.unchanged => FileOutcome::Unchanged {
                            file,
                            policy_name: stats.policy_name,
                        },
                        Ok(Ok(stats)) => FileOutcome::Indexed {
                            file,
                            policy_name: stats.policy_name,
                            chunks: stats.chunk_count,
                            pages: stats.total_pages,
                            ocr_pages: stats.ocr_pages,
                        },
                        Ok(Err(e)) => {
                            tracing::warn!("{} failed: {}", file, e);
                            FileOutcome::Failed {
                                file,
                                reason: e.to_string(),
                            }
                        }
                        Err(_) => FileOutcome::Failed {
                            file,
                            reason: format!("timed out after {}s", file_timeout.as_secs()),
                        },
                    }
                }
            })
            .collect();

        let outcomes = join_all(futures).await;

        // Ingestion has fully completed for every policy past this point, so
        // eligibility reads never race an in-flight upsert.
        let eligibility = match countries {
            Some(countries) if !countries.is_empty() => {
                let mut per_policy = BTreeMap::new();
                for outcome in &outcomes {
                    if self.cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Some(policy_name) = outcome.policy_name() {
                        let summary = self.analyzer.check_many(policy_name, countries).await;
                        per_policy.insert(policy_name.to_string(), summary);
                    }
                }
                Some(per_policy)
            }
            _ => None,
        };

        let summary = BatchSummary::from_outcomes(&outcomes);
        tracing::info!(
            "batch complete: {} indexed, {} unchanged, {} failed, {} cancelled",
            summary.indexed,
            summary.unchanged,
            summary.failed,
            summary.cancelled
        );

        Ok(BatchReport {
            directory: directory.display().to_string(),
            total_files: outcomes.len(),
            outcomes,
            summary,
            eligibility,
            completed_at: chrono::Utc::now(),
        })
    }

    /// Serialize a report to pretty JSON with stable field order
    pub fn export_results(report: &BatchReport, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(path, json)?;
        tracing::info!("report exported to {}", path.display());
        Ok(())
    }
}

/// Regular files directly under the directory, in filename order so reports
/// are deterministic
fn enumerate_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

fn filename_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Derive a readable policy name from a filename:
/// "travel_gold-plan.pdf" becomes "Travel Gold Plan"
fn policy_name_from(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename_of(path));

    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
