// src/extractors/codes.rs

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Characters of surrounding text kept on each side of a match
const CONTEXT_WINDOW: usize = 100;

// --- Regex Patterns (Lazy Static) ---
// Each pattern captures the bare code in group 1; an optional "-MOD" suffix
// (1-5 alphanumerics) is consumed so the word boundary still holds, then dropped.
static CPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{5})(?:-[A-Za-z0-9]{1,5})?\b").expect("Failed to compile CPT_RE")
});

static HCPCS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z]\d{4})(?:-[A-Za-z0-9]{1,5})?\b").expect("Failed to compile HCPCS_RE")
});

static PLA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4}U)(?:-[A-Za-z0-9]{1,5})?\b").expect("Failed to compile PLA_RE")
});

// --- Data Structures ---

/// The three procedure code families recognized in payer documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CodeType {
    Cpt,
    Hcpcs,
    Pla,
}

impl CodeType {
    /// Recognition order. Output records are grouped by kind in this order.
    pub const ALL: [CodeType; 3] = [CodeType::Cpt, CodeType::Hcpcs, CodeType::Pla];

    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::Cpt => "CPT",
            CodeType::Hcpcs => "HCPCS",
            CodeType::Pla => "PLA",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            CodeType::Cpt => &CPT_RE,
            CodeType::Hcpcs => &HCPCS_RE,
            CodeType::Pla => &PLA_RE,
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPT" => Ok(CodeType::Cpt),
            "HCPCS" => Ok(CodeType::Hcpcs),
            "PLA" => Ok(CodeType::Pla),
            other => Err(format!("unknown code type '{}'", other)),
        }
    }
}

/// Source file recorded when none is known.
pub const UNKNOWN_SOURCE: &str = "Unknown";

fn unknown_source() -> String {
    UNKNOWN_SOURCE.to_string()
}

/// Submitter-supplied tags applied to every code found in one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub payer_name: String,
    pub year: i32,
    pub line_of_business: String,
    #[serde(default = "unknown_source")]
    pub source_file: String,
}

impl ExtractionMetadata {
    pub fn new(payer_name: &str, year: i32, line_of_business: &str) -> Self {
        Self {
            payer_name: payer_name.to_string(),
            year,
            line_of_business: line_of_business.to_string(),
            source_file: unknown_source(),
        }
    }

    pub fn with_source_file(mut self, source_file: &str) -> Self {
        self.source_file = source_file.to_string();
        self
    }
}

/// One recognized code tagged with its document's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub code: String,
    pub code_type: CodeType,
    pub payer_name: String,
    pub year: i32,
    pub line_of_business: String,
    #[serde(default = "unknown_source")]
    pub source_file: String,
}

impl CodeRecord {
    fn from_match(code: &str, code_type: CodeType, metadata: &ExtractionMetadata) -> Self {
        Self {
            code: code.to_string(),
            code_type,
            payer_name: metadata.payer_name.clone(),
            year: metadata.year,
            line_of_business: metadata.line_of_business.clone(),
            source_file: metadata.source_file.clone(),
        }
    }
}

/// A raw pattern hit, with byte offsets of the whole match (suffix included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeMatch {
    pub code: String,
    pub code_type: CodeType,
    pub start: usize,
    pub end: usize,
}

impl CodeMatch {
    /// Up to 100 characters of `text` on each side of the match.
    pub fn context<'t>(&self, text: &'t str) -> &'t str {
        let start = text[..self.start]
            .char_indices()
            .rev()
            .take(CONTEXT_WINDOW)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(self.start);
        let end = text[self.end..]
            .char_indices()
            .nth(CONTEXT_WINDOW)
            .map(|(i, _)| self.end + i)
            .unwrap_or(text.len());
        &text[start..end]
    }
}

/// Every match of `code_type` in `text`, left to right.
pub fn find_matches(text: &str, code_type: CodeType) -> Vec<CodeMatch> {
    code_type
        .pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let code = caps.get(1)?;
            Some(CodeMatch {
                code: code.as_str().to_string(),
                code_type,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// All matches grouped CPT, then HCPCS, then PLA; duplicates retained.
pub fn find_all_matches(text: &str) -> Vec<CodeMatch> {
    CodeType::ALL
        .iter()
        .flat_map(|code_type| find_matches(text, *code_type))
        .collect()
}

/// Scans `text` for CPT, HCPCS and PLA codes and tags each unique
/// (code, kind) pair with `metadata`. First occurrence order is kept.
pub fn recognize_codes(text: &str, metadata: &ExtractionMetadata) -> Vec<CodeRecord> {
    let mut seen: HashSet<(String, CodeType)> = HashSet::new();
    let mut records = Vec::new();

    for m in find_all_matches(text) {
        if seen.insert((m.code.clone(), m.code_type)) {
            records.push(CodeRecord::from_match(&m.code, m.code_type, metadata));
        }
    }

    tracing::debug!(
        "Recognized {} unique codes for {} ({})",
        records.len(),
        metadata.source_file,
        metadata.payer_name
    );
    records
}
