// src/extractors/document.rs

use super::codes::{recognize_codes, CodeRecord, ExtractionMetadata};
use super::text::{BlankTextPolicy, TextExtractor};
use crate::utils::error::ExtractError;

/// Runs text extraction then code recognition for one document.
pub struct DocumentProcessor {
    text_extractor: TextExtractor,
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new(TextExtractor::default())
    }
}

impl DocumentProcessor {
    pub fn new(text_extractor: TextExtractor) -> Self {
        Self { text_extractor }
    }

    pub fn with_blank_policy(blank_policy: BlankTextPolicy) -> Self {
        Self::new(TextExtractor::new(blank_policy))
    }

    /// Extracted text only, for callers that also want to inspect it.
    pub fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractError> {
        self.text_extractor.extract_text(pdf_bytes)
    }

    pub fn process_document(
        &self,
        pdf_bytes: &[u8],
        metadata: &ExtractionMetadata,
    ) -> Result<Vec<CodeRecord>, ExtractError> {
        tracing::info!("Processing PDF file: {}", metadata.source_file);

        let text = self.text_extractor.extract_text(pdf_bytes)?;
        let codes = recognize_codes(&text, metadata);

        tracing::info!(
            "Finished processing {}. Extracted {} codes.",
            metadata.source_file,
            codes.len()
        );
        Ok(codes)
    }
}
