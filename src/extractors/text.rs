// src/extractors/text.rs

use std::panic::{self, AssertUnwindSafe};

use lopdf::Document;

use crate::utils::error::ExtractError;

// Appended after every page's text
const PAGE_SEPARATOR: &str = "\n\n";

/// What to do when a strategy succeeds but produces only whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlankTextPolicy {
    /// Treat blank output like a failure and try the next strategy.
    #[default]
    Fallback,
    /// Return the blank text as the result.
    Accept,
}

/// One independent way of turning PDF bytes into plain text.
pub trait TextStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, pdf_bytes: &[u8]) -> Result<String, String>;
}

/// Joins page texts, following each page with a blank line.
fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for page in pages {
        text.push_str(page.as_ref());
        text.push_str(PAGE_SEPARATOR);
    }
    text
}

/// Layout-aware extraction via `pdf-extract`.
pub struct LayoutStrategy;

impl TextStrategy for LayoutStrategy {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, pdf_bytes: &[u8]) -> Result<String, String> {
        // pdf-extract panics on some malformed inputs instead of returning Err
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }));

        match result {
            Ok(Ok(pages)) => Ok(join_pages(pages)),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("pdf-extract panicked while parsing the document".to_string()),
        }
    }
}

/// Object-level extraction via `lopdf`, independent of the layout parser.
pub struct LopdfStrategy;

impl TextStrategy for LopdfStrategy {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract(&self, pdf_bytes: &[u8]) -> Result<String, String> {
        let document = Document::load_mem(pdf_bytes).map_err(|e| e.to_string())?;

        let mut pages = Vec::new();
        for page_number in document.get_pages().keys() {
            let page_text = document
                .extract_text(&[*page_number])
                .map_err(|e| format!("page {}: {}", page_number, e))?;
            pages.push(page_text);
        }

        Ok(join_pages(pages))
    }
}

/// Tries each strategy in order; the first non-blank success wins.
pub struct TextExtractor {
    strategies: Vec<Box<dyn TextStrategy>>,
    blank_policy: BlankTextPolicy,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(BlankTextPolicy::default())
    }
}

impl TextExtractor {
    /// Layout extraction first, lopdf as fallback.
    pub fn new(blank_policy: BlankTextPolicy) -> Self {
        Self::with_strategies(
            vec![Box::new(LayoutStrategy), Box::new(LopdfStrategy)],
            blank_policy,
        )
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn TextStrategy>>,
        blank_policy: BlankTextPolicy,
    ) -> Self {
        Self {
            strategies,
            blank_policy,
        }
    }

    /// Returns the document's text. When no strategy yields non-blank text,
    /// the last strategy's outcome decides: blank text is returned as-is,
    /// an error becomes `ExtractError::Extraction`.
    pub fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractError> {
        tracing::info!("Starting text extraction from PDF ({} bytes)", pdf_bytes.len());

        let mut last_outcome: Option<Result<String, String>> = None;

        for strategy in &self.strategies {
            match strategy.extract(pdf_bytes) {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!(
                        "Successfully extracted text with {} ({} chars)",
                        strategy.name(),
                        text.len()
                    );
                    return Ok(text);
                }
                Ok(text) => {
                    if self.blank_policy == BlankTextPolicy::Accept {
                        tracing::info!("{} produced blank text, accepting it", strategy.name());
                        return Ok(text);
                    }
                    tracing::warn!("{} produced blank text, trying next strategy", strategy.name());
                    last_outcome = Some(Ok(text));
                }
                Err(cause) => {
                    tracing::warn!("Error extracting text with {}: {}", strategy.name(), cause);
                    last_outcome = Some(Err(cause));
                }
            }
        }

        match last_outcome {
            Some(Ok(blank)) => Ok(blank),
            Some(Err(cause)) => {
                tracing::error!("All text extraction strategies failed: {}", cause);
                Err(ExtractError::Extraction { cause })
            }
            None => Err(ExtractError::NoStrategies),
        }
    }
}
