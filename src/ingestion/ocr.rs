//! OCR for scanned pages via external tools (pdftoppm + tesseract)

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// Renders PDF pages to images and runs tesseract on them.
///
/// Both tools are probed before use; a missing tool is reported with an
/// install hint rather than a bare spawn failure.
pub struct OcrEngine {
    dpi: u32,
}

impl OcrEngine {
    /// Create an OCR engine with the given render resolution
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    /// Check if pdftoppm is available
    pub fn has_pdftoppm() -> bool {
        // pdftoppm -v prints to stderr; only check the command exists
        Command::new("pdftoppm").arg("-v").output().is_ok()
    }

    /// Check if tesseract is available
    pub fn has_tesseract() -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Whether the OCR tool chain is usable on this host
    pub fn is_available() -> bool {
        Self::has_pdftoppm() && Self::has_tesseract()
    }

    /// OCR a single PDF page (1-indexed). Returns the recognized text,
    /// which may be empty for a blank page.
    pub fn ocr_pdf_page(&self, pdf_path: &Path, page_number: u32) -> Result<String> {
        if !Self::is_available() {
            return Err(Error::Internal(
                "OCR requires pdftoppm and tesseract. Install with: apt install poppler-utils tesseract-ocr".to_string(),
            ));
        }

        let temp_dir = tempfile::tempdir()?;
        let page_arg = page_number.to_string();
        let prefix = temp_dir.path().join("page");

        let render = Command::new("pdftoppm")
            .args([
                "-png",
                "-r",
                &self.dpi.to_string(),
                "-f",
                &page_arg,
                "-l",
                &page_arg,
                pdf_path.to_str().unwrap_or_default(),
                prefix.to_str().unwrap_or_default(),
            ])
            .output()
            .map_err(|e| Error::Internal(format!("pdftoppm failed: {}", e)))?;

        if !render.status.success() {
            let stderr = String::from_utf8_lossy(&render.stderr);
            return Err(Error::Internal(format!("pdftoppm error on page {}: {}", page_number, stderr)));
        }

        let mut images: Vec<_> = std::fs::read_dir(temp_dir.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        images.sort();

        let Some(image) = images.first() else {
            return Err(Error::Internal(format!("pdftoppm produced no image for page {}", page_number)));
        };

        let ocr = Command::new("tesseract")
            .args([image.to_str().unwrap_or_default(), "stdout", "-l", "eng"])
            .output()
            .map_err(|e| Error::Internal(format!("tesseract failed on page {}: {}", page_number, e)))?;

        if !ocr.status.success() {
            let stderr = String::from_utf8_lossy(&ocr.stderr);
            return Err(Error::Internal(format!("tesseract error on page {}: {}", page_number, stderr)));
        }

        let text = String::from_utf8_lossy(&ocr.stdout).to_string();
        tracing::debug!("OCR recovered {} characters from page {}", text.trim().len(), page_number);
        Ok(text)
    }
}
