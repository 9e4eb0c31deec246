//! Request and response bodies of the HTTP API

use serde::Serialize;

use crate::extractors::codes::CodeType;
use crate::extractors::lookup::CodeLookup;
use crate::storage::StoredCode;

#[derive(Debug, Serialize)]
pub struct ProcessPdfResponse {
    pub message: String,
    pub extracted_codes: Vec<StoredCode>,
}

#[derive(Debug, Serialize)]
pub struct SaveCodesResponse {
    pub message: String,
    pub saved_codes: Vec<StoredCode>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub code: String,
    pub code_type: Option<CodeType>,
    #[serde(flatten)]
    pub lookup: CodeLookup,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Fields collected from the `process-pdf` multipart form.
#[derive(Debug, Default)]
pub struct PdfUploadForm {
    pub file_name: Option<String>,
    pub file_bytes: Option<Vec<u8>>,
    pub payer_name: String,
    pub line_of_business: String,
    pub year: Option<String>,
}
