//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported file types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Old Microsoft Word document (.doc) - requires LibreOffice
    Doc,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "doc" => Self::Doc,
            _ => Self::Unknown,
        }
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Doc => "Word Document (.doc)",
            Self::Unknown => "Unknown",
        }
    }
}

/// Text content of a single page.
///
/// Word documents carry no page boundaries at parse time, so their pages are
/// reported with `page_number: None` rather than a fabricated number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// Page number (1-indexed), unknown for Word documents
    pub page_number: Option<u32>,
    /// Text content of the page
    pub content: String,
}

/// A document after text extraction. Not persisted; consumed by the chunker.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Original filename
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Ordered per-page text
    pub pages: Vec<PageText>,
    /// Total pages in the source document (if known)
    pub total_pages: Option<u32>,
    /// Number of pages that required OCR
    pub ocr_pages: u32,
    /// Content hash for change detection
    pub content_hash: String,
}

impl ExtractedDocument {
    /// Whether any page needed the OCR fallback
    pub fn used_ocr(&self) -> bool {
        self.ocr_pages > 0
    }

    /// Total extracted characters across all pages
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.content.len()).sum()
    }
}

/// Hash text content for change detection
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Source information for a chunk (used for citations)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Original filename
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// First page the chunk's span touches (1-indexed)
    pub page_number: Option<u32>,
    /// Last page the chunk's span touches, when it crosses a boundary
    pub page_end: Option<u32>,
    /// Total pages in the document
    pub page_count: Option<u32>,
    /// Section or heading label, when one precedes the chunk
    pub section_title: Option<String>,
}

impl ChunkSource {
    /// Format source for display, e.g. "policy.pdf, Page 3, Section 2.1"
    pub fn format_citation(&self) -> String {
        let mut parts = vec![self.filename.clone()];

        match (self.page_number, self.page_end) {
            (Some(start), Some(end)) if end > start => parts.push(format!("Pages {}-{}", start, end)),
            (Some(page), _) => parts.push(format!("Page {}", page)),
            _ => {}
        }

        if let Some(section) = &self.section_title {
            parts.push(format!("Section: {}", section));
        }

        parts.join(", ")
    }
}

/// An atomic retrieval unit: one contiguous span of one document.
///
/// Ids are derived from the policy name and sequence index so re-chunking the
/// same text yields the same ids, which keeps index upserts idempotent and
/// citations reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk id, unique within a policy
    pub id: String,
    /// Policy this chunk belongs to
    pub policy_name: String,
    /// Ordered sequence index within the policy
    pub chunk_index: u32,
    /// Text content
    pub content: String,
    /// Source information for citations
    pub source: ChunkSource,
    /// Byte position of the span in the concatenated document text
    pub char_start: usize,
    pub char_end: usize,
}

impl Chunk {
    /// Derive the chunk id for a policy and sequence index
    pub fn derive_id(policy_name: &str, index: u32) -> String {
        format!("{}_{}", slugify(policy_name), index)
    }
}

/// Normalize a policy name into a stable identifier fragment
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_detection() {
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("docx"), FileType::Docx);
        assert_eq!(FileType::from_extension("doc"), FileType::Doc);
        assert_eq!(FileType::from_extension("xlsx"), FileType::Unknown);
        assert!(!FileType::Unknown.is_supported());
    }

    #[test]
    fn slugify_is_stable() {
        assert_eq!(slugify("Travel Insurance Gold"), "travel-insurance-gold");
        assert_eq!(slugify("  Gold++Plan  "), "gold-plan");
        assert_eq!(Chunk::derive_id("Gold Plan", 3), "gold-plan_3");
    }

    #[test]
    fn citation_formats_page_range() {
        let source = ChunkSource {
            filename: "policy.pdf".into(),
            file_type: FileType::Pdf,
            page_number: Some(3),
            page_end: Some(4),
            page_count: Some(12),
            section_title: Some("Section 2.1".into()),
        };
        assert_eq!(source.format_citation(), "policy.pdf, Pages 3-4, Section: Section 2.1");
    }
}
