//! API routes for the code extractor

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{
    clear_codes, export_csv, list_codes, lines_of_business, lookup_code, payers, process_pdf,
    save_codes, search_codes, upload_to_azure,
};
use crate::databricks::DatabricksClient;
use crate::extractors::DocumentProcessor;
use crate::storage::CodeStore;

/// Shared handler state, built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CodeStore>,
    pub processor: Arc<DocumentProcessor>,
    pub databricks: DatabricksClient,
}

/// Create the main API router
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // Stored codes
        .route("/api/codes", get(list_codes).post(save_codes).delete(clear_codes))
        .route("/api/codes/search", get(search_codes))
        .route("/api/codes/{code}/lookup", get(lookup_code))
        .route("/api/payers", get(payers))
        .route("/api/lines-of-business", get(lines_of_business))
        // Ingest and export
        .route("/api/process-pdf", post(process_pdf))
        .route("/api/export-csv", get(export_csv))
        .route("/api/upload-to-azure", post(upload_to_azure))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
