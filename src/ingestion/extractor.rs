//! Multi-format text extraction with OCR fallback
//!
//! PDFs are extracted page by page so chunk citations can carry page numbers;
//! pages with no embedded text fall back to OCR on a rendered image. Word
//! documents are parsed paragraph by paragraph and report their pages as
//! unknown, since .docx carries no page boundaries at parse time.

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::config::IngestionConfig;
use crate::error::{Error, Result};
use crate::types::document::{hash_content, ExtractedDocument, FileType, PageText};

use super::ocr::OcrEngine;

/// Hard cap on embedded-text extraction, so a PDF with pathological fonts
/// cannot stall a whole batch.
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Extracts ordered per-page plain text from policy documents
pub struct DocumentIngester {
    config: IngestionConfig,
    ocr: OcrEngine,
}

impl DocumentIngester {
    /// Create an ingester from config
    pub fn new(config: IngestionConfig) -> Self {
        let ocr = OcrEngine::new(config.ocr_dpi);
        Self { config, ocr }
    }

    /// Extract text from a file on disk
    pub fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let data = std::fs::read(path)?;
        self.extract_bytes(&filename, &data)
    }

    /// Extract text from uploaded bytes
    pub fn extract_bytes(&self, filename: &str, data: &[u8]) -> Result<ExtractedDocument> {
        let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        let file_type = FileType::from_extension(&extension);

        match file_type {
            FileType::Pdf => self.extract_pdf(filename, data),
            FileType::Docx => self.extract_docx(filename, data, FileType::Docx),
            FileType::Doc => {
                let converted = self.convert_doc_with_libreoffice(filename, data)?;
                self.extract_docx(filename, &converted, FileType::Doc)
            }
            FileType::Unknown => Err(Error::UnsupportedFormat(format!(
                "{} (.{}) - supported formats: .pdf, .docx, .doc",
                filename, extension
            ))),
        }
    }

    /// Extract several files, recording per-file errors instead of aborting
    pub fn extract_many<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a Path>,
    ) -> Vec<(String, Result<ExtractedDocument>)> {
        paths
            .into_iter()
            .map(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                let result = self.extract(path);
                if let Err(e) = &result {
                    tracing::warn!("extraction failed for {}: {}", name, e);
                }
                (name, result)
            })
            .collect()
    }

    fn extract_pdf(&self, filename: &str, data: &[u8]) -> Result<ExtractedDocument> {
        let total_pages = lopdf::Document::load_mem(data)
            .ok()
            .map(|doc| doc.get_pages().len() as u32);

        let mut page_texts = match extract_pdf_pages_with_timeout(data) {
            Ok(pages) => pages,
            Err(e) => {
                // Per-page extraction failed outright; a whole-document pass
                // still salvages text-based PDFs with odd page trees.
                tracing::warn!("per-page extraction failed for {}: {}, trying whole-document pass", filename, e);
                match extract_pdf_whole_with_timeout(data) {
                    Ok(text) => vec![text],
                    Err(_) => vec![String::new(); total_pages.unwrap_or(1) as usize],
                }
            }
        };

        for text in &mut page_texts {
            *text = cleanup_extracted_text(text);
        }

        let mut ocr_pages = 0u32;
        if self.config.use_ocr && page_texts.iter().any(|t| t.trim().is_empty()) {
            ocr_pages = self.ocr_empty_pages(filename, data, &mut page_texts)?;
        }

        let pages: Vec<PageText> = page_texts
            .into_iter()
            .enumerate()
            .map(|(i, content)| PageText {
                page_number: Some(i as u32 + 1),
                content,
            })
            .collect();

        if pages.iter().all(|p| p.content.trim().is_empty()) {
            return Err(Error::extraction(
                filename,
                "no text could be extracted, even with OCR; the document may be blank or encrypted",
            ));
        }

        let full_text: String = pages.iter().map(|p| p.content.as_str()).collect::<Vec<_>>().join("\n\n");
        tracing::info!(
            "extracted {} characters from {} ({} pages, {} via OCR)",
            full_text.len(),
            filename,
            pages.len(),
            ocr_pages
        );

        Ok(ExtractedDocument {
            filename: filename.to_string(),
            file_type: FileType::Pdf,
            total_pages: total_pages.or(Some(pages.len() as u32)),
            ocr_pages,
            content_hash: hash_content(&full_text),
            pages,
        })
    }

    /// Run OCR over pages that produced no embedded text. Returns the number
    /// of pages recovered via OCR.
    fn ocr_empty_pages(&self, filename: &str, data: &[u8], page_texts: &mut [String]) -> Result<u32> {
        if !OcrEngine::is_available() {
            tracing::warn!(
                "{} has pages with no embedded text but OCR tools are missing; those pages stay empty",
                filename
            );
            return Ok(0);
        }

        // pdftoppm works on files, so stage the bytes once for all pages
        let temp_dir = tempfile::tempdir()?;
        let pdf_path = temp_dir.path().join("input.pdf");
        std::fs::write(&pdf_path, data)?;

        let mut recovered = 0u32;
        for (i, text) in page_texts.iter_mut().enumerate() {
            if !text.trim().is_empty() {
                continue;
            }
            let page_number = i as u32 + 1;
            match self.ocr.ocr_pdf_page(&pdf_path, page_number) {
                Ok(ocr_text) if !ocr_text.trim().is_empty() => {
                    *text = cleanup_extracted_text(&ocr_text);
                    recovered += 1;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("OCR failed on page {} of {}: {}", page_number, filename, e),
            }
        }
        Ok(recovered)
    }

    fn extract_docx(&self, filename: &str, data: &[u8], file_type: FileType) -> Result<ExtractedDocument> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::extraction(filename, format!("failed to parse Word document: {}", e)))?;

        let mut content = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
                let mut line = String::new();
                for child in paragraph.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                line.push_str(&t.text);
                            }
                        }
                    }
                }
                if !line.trim().is_empty() {
                    content.push_str(line.trim());
                    content.push_str("\n\n");
                }
            }
        }

        if content.trim().is_empty() {
            return Err(Error::extraction(filename, "Word document contains no text"));
        }

        let content = content.trim_end().to_string();
        tracing::info!("extracted {} characters from {}", content.len(), filename);

        Ok(ExtractedDocument {
            filename: filename.to_string(),
            file_type,
            content_hash: hash_content(&content),
            // Word has no page boundaries at parse time; report unknown
            // rather than fabricating numbers.
            pages: vec![PageText {
                page_number: None,
                content,
            }],
            total_pages: None,
            ocr_pages: 0,
        })
    }

    /// Convert a legacy .doc file to .docx with headless LibreOffice
    fn convert_doc_with_libreoffice(&self, filename: &str, data: &[u8]) -> Result<Vec<u8>> {
        use std::process::Command;

        if !self.config.use_libreoffice {
            return Err(Error::UnsupportedFormat(format!(
                "{} - .doc support requires LibreOffice conversion, which is disabled",
                filename
            )));
        }

        let temp_dir = tempfile::tempdir()?;
        let input_path = temp_dir.path().join(filename);
        std::fs::write(&input_path, data)?;

        let output = Command::new("libreoffice")
            .args([
                "--headless",
                "--convert-to",
                "docx",
                "--outdir",
                temp_dir.path().to_str().unwrap_or_default(),
                input_path.to_str().unwrap_or_default(),
            ])
            .output()
            .map_err(|e| Error::extraction(filename, format!("LibreOffice conversion failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::extraction(filename, format!("LibreOffice error: {}", stderr)));
        }

        let stem = Path::new(filename)
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let converted_path = temp_dir.path().join(format!("{}.docx", stem));
        std::fs::read(&converted_path)
            .map_err(|e| Error::extraction(filename, format!("converted file missing: {}", e)))
    }
}

/// Extract per-page PDF text on a helper thread so a hang in font handling
/// cannot block the caller forever.
fn extract_pdf_pages_with_timeout(data: &[u8]) -> Result<Vec<String>> {
    let data_vec = data.to_vec();
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let result = pdf_extract::extract_text_from_mem_by_pages(&data_vec);
        let _ = tx.send(result);
    });

    match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
        Ok(Ok(pages)) => {
            let _ = handle.join();
            Ok(pages)
        }
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(Error::Internal(format!("pdf text extraction failed: {}", e)))
        }
        Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::Internal(
            "pdf text extraction timed out; the file may have complex fonts".to_string(),
        )),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(Error::Internal("pdf text extraction thread crashed".to_string()))
        }
    }
}

fn extract_pdf_whole_with_timeout(data: &[u8]) -> Result<String> {
    let data_vec = data.to_vec();
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let result = pdf_extract::extract_text_from_mem(&data_vec);
        let _ = tx.send(result);
    });

    match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
        Ok(Ok(text)) => {
            let _ = handle.join();
            Ok(text)
        }
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(Error::Internal(format!("pdf text extraction failed: {}", e)))
        }
        Err(_) => Err(Error::Internal("pdf text extraction timed out".to_string())),
    }
}

/// Normalize extracted text: fold typographic punctuation to ASCII, strip
/// null bytes, and collapse the line noise PDF extractors leave behind.
fn cleanup_extracted_text(text: &str) -> String {
    let normalized = text
        .replace('\0', "")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl");

    normalized
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestionConfig;

    #[test]
    fn unknown_extension_is_unsupported() {
        let ingester = DocumentIngester::new(IngestionConfig::default());
        let err = ingester.extract_bytes("policy.xlsx", b"data").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn corrupt_docx_is_extraction_error() {
        let ingester = DocumentIngester::new(IngestionConfig::default());
        let err = ingester.extract_bytes("policy.docx", b"not a zip archive").unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn cleanup_folds_typographic_punctuation() {
        let cleaned = cleanup_extracted_text("Cover\u{2019}s limit \u{2013} USD 50,000\u{2026}  \n\0");
        assert_eq!(cleaned, "Cover's limit - USD 50,000...");
    }

    #[test]
    fn extract_many_records_failures_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.docx");
        let bad = dir.path().join("b.pdf");
        std::fs::write(&good, b"junk").unwrap();
        std::fs::write(&bad, b"junk").unwrap();

        let ingester = DocumentIngester::new(IngestionConfig {
            use_ocr: false,
            ..IngestionConfig::default()
        });
        let results = ingester.extract_many([good.as_path(), bad.as_path()]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_err()));
    }
}
