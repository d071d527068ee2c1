//! Prompt templates for grounded answer generation

use crate::index::SearchResult;
use crate::types::Citation;

/// Prompt builder for retrieval-grounded questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the grounding context from retrieved chunks
    pub fn build_context(results: &[SearchResult]) -> String {
        let mut context = String::new();

        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                result.chunk.source.format_citation(),
                result.chunk.content
            ));
        }

        context
    }

    /// Build the full grounded prompt for a policy question
    pub fn build_grounded_prompt(question: &str, context: &str, citations: &[Citation]) -> String {
        format!(
            r#"You are an insurance policy assistant that ONLY uses information from the provided policy excerpts.

RULES - FOLLOW THESE EXACTLY:
1. ONLY use information that is EXPLICITLY stated in the EXCERPTS below
2. If the answer is not in the excerpts, say so clearly
3. NEVER use external knowledge or make assumptions beyond what is stated
4. Include specific details such as coverage amounts, limits, and conditions
5. Cite sources inline with each claim in this format: [Source: filename, Page X]
6. Be concise but complete

POLICY EXCERPTS:
{context}

AVAILABLE SOURCES:
{sources}

QUESTION: {question}

Answer using ONLY the excerpts above:"#,
            context = context,
            sources = Self::format_sources_list(citations),
            question = question
        )
    }

    /// Build the normalization prompt used by the policy comparator
    pub fn build_extraction_prompt(category: &str, description: &str) -> String {
        format!(
            r#"Extract the key coverage details from this text. Focus on:
- Coverage amounts and limits (currency and numbers)
- Main conditions or restrictions
- What is covered

Category: {category}
Description: {description}

Provide a concise summary (2-3 sentences max) with specific numbers:"#,
            category = category,
            description = description
        )
    }

    fn format_sources_list(citations: &[Citation]) -> String {
        citations
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut source = format!("[{}] {}", i + 1, c.filename);
                if let Some(page) = c.page_number {
                    source.push_str(&format!(", Page {}", page));
                }
                if let Some(section) = &c.section_title {
                    source.push_str(&format!(", {}", section));
                }
                source
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
