//! Document ingestion: text extraction with OCR fallback, then chunking

mod chunker;
mod extractor;
mod ocr;

pub use chunker::TextChunker;
pub use extractor::DocumentIngester;
pub use ocr::OcrEngine;
