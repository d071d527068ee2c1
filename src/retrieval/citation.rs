//! Citation extraction and linking
//!
//! The model is asked to cite sources inline, but its free-text claims are
//! never trusted verbatim: every claim is resolved against the chunks that
//! were actually retrieved for the question, and claims that match nothing
//! are dropped. A returned citation therefore always points at a retrieved
//! chunk.

use regex::Regex;

use crate::types::Citation;

/// Extract `[Source: ...]` claims from an answer and link them to the
/// retrieved citation set. Returns the answer (with a sources footer appended
/// when the model cited nothing) and the linked citations.
pub fn extract_and_link_citations(
    answer: &str,
    available: &mut Vec<Citation>,
) -> (String, Vec<Citation>) {
    let citation_pattern = Regex::new(r"\[Source:\s*([^,\]]+)(?:,\s*Pages?\s*(\d+))?[^\]]*\]")
        .expect("citation pattern is valid");

    let mut linked: Vec<Citation> = Vec::new();
    let mut answer_text = answer.to_string();

    for cap in citation_pattern.captures_iter(answer) {
        let filename = cap.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        let page: Option<u32> = cap.get(2).and_then(|m| m.as_str().parse().ok());

        if let Some(citation) = find_matching_citation(available, filename, page) {
            if !linked.iter().any(|c| c.chunk_id == citation.chunk_id) {
                linked.push(citation);
            }
        }
    }

    // Model cited nothing usable: fall back to the strongest retrieved
    // chunks so the answer still carries verifiable provenance.
    if linked.is_empty() && !available.is_empty() {
        available.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        linked.extend(available.iter().take(3).cloned());

        answer_text.push_str("\n\nSources used:");
        for citation in &linked {
            answer_text.push_str(&format!("\n- {}", citation.format_inline()));
        }
    }

    (answer_text, linked)
}

fn find_matching_citation(citations: &[Citation], filename: &str, page: Option<u32>) -> Option<Citation> {
    if filename.is_empty() {
        return None;
    }
    let filename_lower = filename.to_lowercase();

    // Exact filename + page first
    if let Some(p) = page {
        for citation in citations {
            if filenames_match(&citation.filename, &filename_lower) && citation.page_number == Some(p) {
                return Some(citation.clone());
            }
        }
    }

    // Then filename alone
    citations
        .iter()
        .find(|c| filenames_match(&c.filename, &filename_lower))
        .cloned()
}

fn filenames_match(candidate: &str, claimed_lower: &str) -> bool {
    let candidate = candidate.to_lowercase();
    candidate == *claimed_lower || candidate.contains(claimed_lower) || claimed_lower.contains(&candidate)
}
