//! Eligibility, comparison, and batch report types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::response::Citation;

/// Eligibility verdict for one country under one policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    /// The policy explicitly covers the country
    Eligible,
    /// The policy explicitly excludes or restricts the country
    NotEligible,
    /// Coverage could not be determined from the documents
    Uncertain,
}

/// Result of checking one country against one policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    /// Policy that was checked
    pub policy_name: String,
    /// Country as given by the caller
    pub country: String,
    /// Normalized country name used for matching
    pub country_normalized: String,
    /// Classification outcome
    pub status: EligibilityStatus,
    /// Supporting detail from the retrieval answer
    pub detail: String,
    /// Citations backing the verdict
    pub citations: Vec<Citation>,
}

/// Aggregated eligibility results for one policy across many countries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilitySummary {
    /// Policy that was checked
    pub policy_name: String,
    /// Countries classified as covered
    pub eligible: Vec<String>,
    /// Countries classified as excluded
    pub not_eligible: Vec<String>,
    /// Countries that could not be classified
    pub uncertain: Vec<String>,
    /// Per-country verdicts in the order they were checked
    pub verdicts: Vec<EligibilityVerdict>,
}

impl EligibilitySummary {
    /// Fold verdicts into a summary
    pub fn from_verdicts(policy_name: String, verdicts: Vec<EligibilityVerdict>) -> Self {
        let mut summary = Self {
            policy_name,
            eligible: Vec::new(),
            not_eligible: Vec::new(),
            uncertain: Vec::new(),
            verdicts: Vec::new(),
        };
        for verdict in &verdicts {
            let bucket = match verdict.status {
                EligibilityStatus::Eligible => &mut summary.eligible,
                EligibilityStatus::NotEligible => &mut summary.not_eligible,
                EligibilityStatus::Uncertain => &mut summary.uncertain,
            };
            bucket.push(verdict.country.clone());
        }
        summary.verdicts = verdicts;
        summary
    }

    /// Number of countries checked
    pub fn total(&self) -> usize {
        self.verdicts.len()
    }
}

/// One cell in a comparison table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonCell {
    /// Policy this value was extracted from
    pub policy_name: String,
    /// Normalized short value, or "not found" when the policy is silent
    pub value: String,
}

impl ComparisonCell {
    /// Explicit cell for a category the policy does not document
    pub fn not_found(policy_name: String) -> Self {
        Self {
            policy_name,
            value: "not found".to_string(),
        }
    }

    /// Whether the category was found in this policy
    pub fn is_found(&self) -> bool {
        self.value != "not found"
    }
}

/// One coverage category across all compared policies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Coverage category, e.g. "Medical"
    pub category: String,
    /// Exactly one cell per compared policy
    pub values: Vec<ComparisonCell>,
}

/// Rectangular comparison of N policies across M categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonTable {
    /// Compared policies, in the order given by the caller
    pub policies: Vec<String>,
    /// Compared categories, in row order
    pub categories: Vec<String>,
    /// One row per category, each with one cell per policy
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    /// Look up the cell for a (category, policy) pair
    pub fn cell(&self, category: &str, policy: &str) -> Option<&ComparisonCell> {
        self.rows
            .iter()
            .find(|r| r.category == category)
            .and_then(|r| r.values.iter().find(|c| c.policy_name == policy))
    }
}

/// Outcome of processing one file in a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// File extracted, chunked, and indexed
    Indexed {
        file: String,
        policy_name: String,
        chunks: u32,
        pages: Option<u32>,
        ocr_pages: u32,
    },
    /// File content unchanged since last ingestion, skipped
    Unchanged { file: String, policy_name: String },
    /// Processing failed; the rest of the batch was unaffected
    Failed { file: String, reason: String },
    /// Batch was aborted before this file started
    Cancelled { file: String },
}

impl FileOutcome {
    /// Filename for any outcome variant
    pub fn file(&self) -> &str {
        match self {
            Self::Indexed { file, .. }
            | Self::Unchanged { file, .. }
            | Self::Failed { file, .. }
            | Self::Cancelled { file } => file,
        }
    }

    /// Whether the file's chunks are available for querying
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed { .. } | Self::Unchanged { .. })
    }

    /// Policy name for indexed outcomes
    pub fn policy_name(&self) -> Option<&str> {
        match self {
            Self::Indexed { policy_name, .. } | Self::Unchanged { policy_name, .. } => {
                Some(policy_name)
            }
            _ => None,
        }
    }
}

/// Counts derived from per-file outcomes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub indexed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total_chunks: u32,
}

impl BatchSummary {
    /// Build the summary from outcomes
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Indexed { chunks, .. } => {
                    summary.indexed += 1;
                    summary.total_chunks += chunks;
                }
                FileOutcome::Unchanged { .. } => summary.unchanged += 1,
                FileOutcome::Failed { .. } => summary.failed += 1,
                FileOutcome::Cancelled { .. } => summary.cancelled += 1,
            }
        }
        summary
    }
}

/// Report for one batch run. Field order is stable so exported JSON diffs
/// cleanly between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Directory that was processed
    pub directory: String,
    /// Number of files considered
    pub total_files: usize,
    /// Per-file outcomes in filename order
    pub outcomes: Vec<FileOutcome>,
    /// Aggregate counts
    pub summary: BatchSummary,
    /// Eligibility summaries per policy, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<BTreeMap<String, EligibilitySummary>>,
    /// When the run completed
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_outcomes() {
        let outcomes = vec![
            FileOutcome::Indexed {
                file: "a.pdf".into(),
                policy_name: "A".into(),
                chunks: 10,
                pages: Some(4),
                ocr_pages: 0,
            },
            FileOutcome::Failed {
                file: "b.pdf".into(),
                reason: "broken".into(),
            },
            FileOutcome::Cancelled { file: "c.pdf".into() },
        ];
        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.indexed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.total_chunks, 10);
    }

    #[test]
    fn eligibility_summary_buckets_by_status() {
        let verdict = |country: &str, status| EligibilityVerdict {
            policy_name: "Gold".into(),
            country: country.into(),
            country_normalized: country.to_lowercase(),
            status,
            detail: String::new(),
            citations: Vec::new(),
        };
        let summary = EligibilitySummary::from_verdicts(
            "Gold".into(),
            vec![
                verdict("Singapore", EligibilityStatus::Eligible),
                verdict("USA", EligibilityStatus::NotEligible),
                verdict("Atlantis", EligibilityStatus::Uncertain),
            ],
        );
        assert_eq!(summary.eligible, vec!["Singapore"]);
        assert_eq!(summary.not_eligible, vec!["USA"]);
        assert_eq!(summary.uncertain, vec!["Atlantis"]);
        assert_eq!(summary.total(), 3);
    }
}
