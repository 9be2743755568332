//! PDF text extraction for heritage-guide documents.

use crate::errors::AppError;
use lopdf::Document;
use tracing::{debug, instrument};

/// Pure bytes-to-text extraction seam. The heritage cold path counts calls
/// through this trait in tests to prove extraction happens at most once per
/// document.
pub trait PdfExtract: Send + Sync {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, AppError>;
}

/// lopdf-backed extractor. Pages are concatenated in page order; pages with
/// no extractable text are skipped.
#[derive(Debug, Default, Clone)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PdfExtract for LopdfExtractor {
    #[instrument(skip_all, fields(len = pdf_bytes.len()))]
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, AppError> {
        let doc = Document::load_mem(pdf_bytes)
            .map_err(|e| AppError::PdfExtractionError(format!("Failed to load PDF: {}", e)))?;

        let pages = doc.get_pages();
        let mut page_numbers: Vec<u32> = pages.keys().copied().collect();
        page_numbers.sort_unstable();

        let mut page_texts = Vec::new();
        for page_num in page_numbers {
            if let Ok(text) = doc.extract_text(&[page_num]) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    page_texts.push(trimmed.to_string());
                }
            }
        }

        debug!(pages = page_texts.len(), "Extracted text from PDF pages");
        Ok(page_texts.join("\n"))
    }
}
