//! Side-by-side policy comparison
//!
//! One retrieval question per (policy, category) pair, normalized into short
//! values. The table stays rectangular: a category a policy never documents
//! is an explicit "not found" cell, never a missing one.

use std::sync::Arc;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::retrieval::{PromptBuilder, QaEngine};
use crate::types::{ComparisonCell, ComparisonRow, ComparisonTable};

/// Categories compared when the caller does not supply a set
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Medical",
    "Baggage",
    "Trip Delay",
    "Trip Cancellation",
    "Emergency Evacuation",
    "Personal Accident",
];

/// Compares coverage across policies
pub struct PolicyComparator {
    qa: Arc<QaEngine>,
    llm: Arc<dyn LlmProvider>,
}

impl PolicyComparator {
    /// Create a comparator over a QA engine and a generative model
    pub fn new(qa: Arc<QaEngine>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { qa, llm }
    }

    /// Compare policies across coverage categories.
    ///
    /// Retrieval and generation errors propagate; a policy that is merely
    /// silent on a category gets a "not found" cell.
    pub async fn compare(
        &self,
        policy_names: &[String],
        categories: Option<&[String]>,
    ) -> Result<ComparisonTable> {
        let categories: Vec<String> = match categories {
            Some(given) => given.to_vec(),
            None => DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        };

        let mut rows = Vec::with_capacity(categories.len());

        for category in &categories {
            let question = category_question(category);
            let mut values = Vec::with_capacity(policy_names.len());

            for policy_name in policy_names {
                let scope = [policy_name.clone()];
                let answer = self.qa.answer(&question, Some(&scope)).await?;

                let cell = if answer.is_grounded() {
                    ComparisonCell {
                        policy_name: policy_name.clone(),
                        value: self.normalize(category, &answer.answer).await,
                    }
                } else {
                    ComparisonCell::not_found(policy_name.clone())
                };
                values.push(cell);
            }

            rows.push(ComparisonRow {
                category: category.clone(),
                values,
            });
        }

        tracing::info!(
            "compared {} policies across {} categories",
            policy_names.len(),
            categories.len()
        );

        Ok(ComparisonTable {
            policies: policy_names.to_vec(),
            categories,
            rows,
        })
    }

    /// Condense a full answer into a short cell value. Normalization is a
    /// best-effort pass; if it fails, the truncated answer still makes a
    /// usable cell.
    async fn normalize(&self, category: &str, description: &str) -> String {
        let prompt = PromptBuilder::build_extraction_prompt(category, description);
        match self.llm.generate(&prompt).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => truncate(description, 200),
            Err(e) => {
                tracing::warn!("normalization failed for category {}: {}", category, e);
                truncate(description, 200)
            }
        }
    }
}

/// The question asked for each coverage category
fn category_question(category: &str) -> String {
    match category {
        "Medical" => "What is the medical expense coverage limit and what does it cover?".to_string(),
        "Baggage" => "What is the baggage loss or damage coverage limit?".to_string(),
        "Trip Delay" => "What is the trip delay coverage and its conditions?".to_string(),
        "Trip Cancellation" => "What is the trip cancellation coverage limit and conditions?".to_string(),
        "Emergency Evacuation" => "What is the emergency evacuation coverage?".to_string(),
        "Personal Accident" => "What is the personal accident death benefit coverage?".to_string(),
        "Exclusions" => "What are the main exclusions in this policy?".to_string(),
        other => format!("What is the {} coverage in this policy?", other),
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    match text[..end].rfind(' ') {
        Some(pos) => format!("{}...", &text[..pos]),
        None => format!("{}...", &text[..end]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_categories_have_specific_questions() {
        assert!(category_question("Medical").contains("medical expense"));
        assert!(category_question("Baggage").contains("baggage"));
        assert!(category_question("Pet Care").contains("Pet Care"));
    }

    #[test]
    fn truncate_prefers_word_boundaries() {
        let text = "The medical expense coverage limit is USD 50,000 per insured person per trip.";
        let cut = truncate(text, 30);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 33);
    }
}
