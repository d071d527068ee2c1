//! Retrieval-grounded question answering

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::index::EmbeddingIndex;
use crate::providers::LlmProvider;
use crate::types::{Answer, Citation};

use super::citation::extract_and_link_citations;
use super::prompt::PromptBuilder;

/// Answers questions about indexed policies with source citations
pub struct QaEngine {
    index: Arc<EmbeddingIndex>,
    llm: Arc<dyn LlmProvider>,
    config: RetrievalConfig,
}

impl QaEngine {
    /// Create a QA engine over an index and a generative model
    pub fn new(index: Arc<EmbeddingIndex>, llm: Arc<dyn LlmProvider>, config: RetrievalConfig) -> Self {
        Self { index, llm, config }
    }

    /// The index this engine reads from
    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    /// Answer a question with the configured top_k
    pub async fn answer(&self, question: &str, policy_scope: Option<&[String]>) -> Result<Answer> {
        self.answer_with_top_k(question, policy_scope, self.config.top_k).await
    }

    /// Answer a question, retrieving at most `top_k` chunks.
    ///
    /// Empty retrieval yields an explicit insufficient-information answer
    /// with no citations rather than a fabricated one; generation failures
    /// propagate as errors, distinct from that case.
    pub async fn answer_with_top_k(
        &self,
        question: &str,
        policy_scope: Option<&[String]>,
        top_k: usize,
    ) -> Result<Answer> {
        tracing::info!("question: \"{}\"", question);

        // Over-fetch so the threshold filter still leaves top_k candidates
        let mut results = self.index.query(question, policy_scope, top_k * 2).await?;
        results.retain(|r| r.similarity >= self.config.similarity_threshold);
        results.truncate(top_k);

        if results.is_empty() {
            tracing::info!("no relevant chunks retrieved; returning insufficient-information answer");
            return Ok(Answer::insufficient(question.to_string()));
        }

        let mut citations: Vec<Citation> = results
            .iter()
            .map(|r| Citation::from_chunk(&r.chunk, r.similarity))
            .collect();

        let context = PromptBuilder::build_context(&results);
        let prompt = PromptBuilder::build_grounded_prompt(question, &context, &citations);

        let raw_answer = self.llm.generate(&prompt).await?;
        let (answer_text, linked) = extract_and_link_citations(&raw_answer, &mut citations);

        tracing::info!(
            "answered with {} citations from {} retrieved chunks",
            linked.len(),
            results.len()
        );

        Ok(Answer::new(question.to_string(), answer_text, linked, results.len()))
    }
}
