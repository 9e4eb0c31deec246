// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to extract text from PDF: {cause}")]
    Extraction { cause: String },

    #[error("No text extraction strategies configured")]
    NoStrategies,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Code store lock poisoned")]
    LockPoisoned,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid value in column '{column}': {value}")]
    InvalidValue { column: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum DatabricksError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("DBFS rejected the upload ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to build CSV payload: {0}")]
    Payload(#[from] ExportError),
}

/// Errors surfaced by HTTP handlers. Rendered as `{"error": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Error processing PDF: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Error exporting CSV: {0}")]
    Export(#[from] ExportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Upload failed: {0}")]
    Upload(#[from] DatabricksError),
}
