//! Answer and citation types returned by the QA engine

use serde::{Deserialize, Serialize};

use super::document::Chunk;

/// Citation from a source document. Always resolves to a chunk that was
/// retrieved for the answer it accompanies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk id
    pub chunk_id: String,
    /// Policy the chunk belongs to
    pub policy_name: String,
    /// Source filename
    pub filename: String,
    /// Page number (if applicable)
    pub page_number: Option<u32>,
    /// Section title (if detected)
    pub section_title: Option<String>,
    /// Exact snippet from the source
    pub snippet: String,
    /// Similarity score (0.0-1.0)
    pub similarity_score: f32,
}

impl Citation {
    /// Create a citation from a chunk and similarity score
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            policy_name: chunk.policy_name.clone(),
            filename: chunk.source.filename.clone(),
            page_number: chunk.source.page_number,
            section_title: chunk.source.section_title.clone(),
            snippet: chunk.content.clone(),
            similarity_score,
        }
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        let mut parts = vec![self.filename.clone()];
        if let Some(page) = self.page_number {
            parts.push(format!("Page {}", page));
        }
        if let Some(section) = &self.section_title {
            parts.push(section.clone());
        }
        format!("[Source: {}]", parts.join(", "))
    }
}

/// Answer to a question, grounded in retrieved chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The question that was asked
    pub question: String,
    /// Generated answer text
    pub answer: String,
    /// Citations derived from the chunks actually used
    pub citations: Vec<Citation>,
    /// Mean similarity of the cited chunks (0.0 when ungrounded)
    pub confidence: f32,
    /// Number of chunks retrieved for this question
    pub chunks_retrieved: usize,
}

impl Answer {
    /// Create a grounded answer
    pub fn new(question: String, answer: String, citations: Vec<Citation>, chunks_retrieved: usize) -> Self {
        let confidence = if citations.is_empty() {
            0.0
        } else {
            citations.iter().map(|c| c.similarity_score).sum::<f32>() / citations.len() as f32
        };
        Self {
            question,
            answer,
            citations,
            confidence,
            chunks_retrieved,
        }
    }

    /// Successful answer for a question the indexed documents cannot answer.
    /// This is not an error: retrieval worked and found nothing relevant.
    pub fn insufficient(question: String) -> Self {
        Self {
            question,
            answer: "I couldn't find relevant information in the policy documents to answer this question.".to_string(),
            citations: Vec::new(),
            confidence: 0.0,
            chunks_retrieved: 0,
        }
    }

    /// Whether the answer is backed by at least one citation
    pub fn is_grounded(&self) -> bool {
        !self.citations.is_empty()
    }
}
