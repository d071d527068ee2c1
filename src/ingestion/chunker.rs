//! Deterministic text chunking with page and section tracking
//!
//! Page texts are concatenated while retaining boundary offsets, then walked
//! sentence by sentence into chunks of at most `chunk_size` characters. Each
//! chunk starts with the exact trailing `chunk_overlap`-character suffix of
//! its predecessor, so context survives a cut and the overlap never cascades
//! across more than two adjacent chunks. Re-chunking the same text with the
//! same parameters yields byte-identical chunks with the same derived ids.

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::document::{Chunk, ChunkSource, ExtractedDocument};

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    min_chunk_size: usize,
    heading_pattern: Regex,
}

/// Page boundary in the concatenated text
struct PageBoundary {
    start: usize,
    page_number: Option<u32>,
}

impl TextChunker {
    /// Create a chunker from config
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            min_chunk_size: config.min_chunk_size,
            heading_pattern: Regex::new(r"(?mi)^(?:section|chapter|article|part)\s+\d+(?:\.\d+)*[:.\-]?[^\n]*")
                .expect("heading pattern is valid"),
        }
    }

    /// Chunk an extracted document for one policy
    pub fn chunk(&self, policy_name: &str, doc: &ExtractedDocument) -> Vec<Chunk> {
        let (full_text, boundaries) = concatenate_pages(doc);
        if full_text.trim().is_empty() {
            return Vec::new();
        }

        let headings = self.find_headings(&full_text);

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current = String::new();
        let mut current_start = 0usize;
        let mut pos = 0usize;

        let max_piece = self.chunk_size.saturating_sub(self.overlap).max(1);
        for sentence in full_text.split_sentence_bounds() {
            for piece in split_oversized(sentence, max_piece) {
                if !current.is_empty() && current.len() + piece.len() > self.chunk_size {
                    self.emit(policy_name, doc, &mut chunks, &current, current_start, pos, &boundaries, &headings);
                    let suffix = overlap_suffix(&current, self.overlap);
                    current_start = pos - suffix.len();
                    current = suffix.to_string();
                }
                current.push_str(piece);
                pos += piece.len();
            }
        }

        // Trailing remainder: drop it only when it is tiny and the document
        // already produced chunks.
        if !current.trim().is_empty()
            && (chunks.is_empty() || current.trim().len() >= self.min_chunk_size)
        {
            self.emit(policy_name, doc, &mut chunks, &current, current_start, pos, &boundaries, &headings);
        }

        chunks
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        policy_name: &str,
        doc: &ExtractedDocument,
        chunks: &mut Vec<Chunk>,
        content: &str,
        char_start: usize,
        char_end: usize,
        boundaries: &[PageBoundary],
        headings: &[(usize, String)],
    ) {
        if content.trim().is_empty() {
            return;
        }

        let page_number = page_at(boundaries, char_start);
        let page_end = page_at(boundaries, char_end.saturating_sub(1)).filter(|end| Some(*end) != page_number);
        let section_title = headings
            .iter()
            .rev()
            .find(|(offset, _)| *offset <= char_start)
            .map(|(_, title)| title.clone());

        let index = chunks.len() as u32;
        chunks.push(Chunk {
            id: Chunk::derive_id(policy_name, index),
            policy_name: policy_name.to_string(),
            chunk_index: index,
            content: content.to_string(),
            source: ChunkSource {
                filename: doc.filename.clone(),
                file_type: doc.file_type.clone(),
                page_number,
                page_end,
                page_count: doc.total_pages,
                section_title,
            },
            char_start,
            char_end,
        });
    }

    /// Locate section headings and their offsets in the concatenated text
    fn find_headings(&self, text: &str) -> Vec<(usize, String)> {
        self.heading_pattern
            .find_iter(text)
            .map(|m| {
                let mut title = m.as_str().trim().to_string();
                if title.len() > 80 {
                    title.truncate(80);
                    title = title.trim_end().to_string();
                }
                (m.start(), title)
            })
            .collect()
    }
}

/// The exact trailing overlap of a chunk, used verbatim as the next chunk's
/// prefix. Empty when the chunk is no longer than the overlap, which keeps
/// overlap from cascading through a run of short chunks.
pub fn overlap_suffix(text: &str, overlap: usize) -> &str {
    if overlap == 0 || text.len() <= overlap {
        return "";
    }
    let mut start = text.len() - overlap;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Split a sentence that alone exceeds the piece limit into char-boundary
/// windows, so no emitted chunk can exceed `chunk_size`.
fn split_oversized(sentence: &str, max_piece: usize) -> Vec<&str> {
    if sentence.len() <= max_piece {
        return vec![sentence];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < sentence.len() {
        let mut end = (start + max_piece).min(sentence.len());
        while !sentence.is_char_boundary(end) {
            end -= 1;
        }
        pieces.push(&sentence[start..end]);
        start = end;
    }
    pieces
}

fn concatenate_pages(doc: &ExtractedDocument) -> (String, Vec<PageBoundary>) {
    let mut text = String::with_capacity(doc.total_chars() + doc.pages.len() * 2);
    let mut boundaries = Vec::with_capacity(doc.pages.len());

    for (i, page) in doc.pages.iter().enumerate() {
        if i > 0 {
            text.push_str("\n\n");
        }
        boundaries.push(PageBoundary {
            start: text.len(),
            page_number: page.page_number,
        });
        text.push_str(&page.content);
    }

    (text, boundaries)
}

fn page_at(boundaries: &[PageBoundary], offset: usize) -> Option<u32> {
    boundaries
        .iter()
        .rev()
        .find(|b| b.start <= offset)
        .and_then(|b| b.page_number)
}
