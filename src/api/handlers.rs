//! HTTP handlers for the code extractor API

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use chrono::Datelike;

use super::models::{
    LookupResponse, MessageResponse, PdfUploadForm, ProcessPdfResponse, SaveCodesResponse,
};
use super::routes::AppState;
use crate::databricks::{upload_outcome, DbfsConnection, UploadOutcome};
use crate::export::{codes_to_csv, CSV_FILE_NAME};
use crate::extractors::codes::{CodeRecord, ExtractionMetadata, UNKNOWN_SOURCE};
use crate::extractors::lookup;
use crate::storage::{SearchQuery, StoredCode};
use crate::utils::error::ApiError;

const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2100;

/// Get all extracted codes
pub async fn list_codes(State(state): State<AppState>) -> Result<Json<Vec<StoredCode>>, ApiError> {
    Ok(Json(state.store.all()?))
}

/// Search extracted codes by term, payer, line of business and year
pub async fn search_codes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<StoredCode>>, ApiError> {
    let codes = state.store.query(&query)?;
    tracing::debug!("Search {:?} matched {} codes", query, codes.len());
    Ok(Json(codes))
}

/// Get unique payer names
pub async fn payers(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.store.payers()?))
}

/// Get unique lines of business
pub async fn lines_of_business(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.store.lines_of_business()?))
}

/// Category and description for a single code
pub async fn lookup_code(Path(code): Path<String>) -> Json<LookupResponse> {
    Json(LookupResponse {
        code_type: lookup::classify(&code),
        lookup: lookup::lookup_code(&code),
        code,
    })
}

/// Process an uploaded PDF and store the codes found in it
pub async fn process_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProcessPdfResponse>, ApiError> {
    let form = read_upload_form(multipart).await?;

    let file_name = form
        .file_name
        .ok_or_else(|| ApiError::BadRequest("No file part".to_string()))?;
    if file_name.is_empty() {
        return Err(ApiError::BadRequest("No file selected".to_string()));
    }
    if !file_name.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::BadRequest("Only PDF files are allowed".to_string()));
    }

    let year = parse_year(form.year.as_deref())?;
    let payer_name = form.payer_name.trim();
    let line_of_business = form.line_of_business.trim();
    if payer_name.is_empty() || line_of_business.is_empty() {
        return Err(ApiError::BadRequest(
            "Metadata (payer name and line of business) is required".to_string(),
        ));
    }

    let metadata = ExtractionMetadata::new(payer_name, year, line_of_business)
        .with_source_file(&secure_filename(&file_name));
    let pdf_bytes = form.file_bytes.unwrap_or_default();
    tracing::info!(
        "Processing upload {} ({} bytes) for {} / {} / {}",
        file_name,
        pdf_bytes.len(),
        metadata.payer_name,
        metadata.line_of_business,
        metadata.year
    );

    // PDF parsing is CPU bound; keep it off the async workers
    let processor = Arc::clone(&state.processor);
    let codes = tokio::task::spawn_blocking(move || processor.process_document(&pdf_bytes, &metadata))
        .await
        .map_err(|e| ApiError::Internal(format!("PDF processing task failed: {}", e)))??;

    let extracted_codes = state.store.save(codes)?;
    Ok(Json(ProcessPdfResponse {
        message: format!("Successfully processed {}", file_name),
        extracted_codes,
    }))
}

/// Save codes posted directly as JSON
pub async fn save_codes(
    State(state): State<AppState>,
    payload: Result<Json<Vec<CodeRecord>>, JsonRejection>,
) -> Result<Json<SaveCodesResponse>, ApiError> {
    let Json(codes) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid code data: {}", e.body_text())))?;
    if codes.is_empty() {
        return Err(ApiError::BadRequest("No codes provided".to_string()));
    }

    let saved_codes = state.store.save(codes)?;
    Ok(Json(SaveCodesResponse {
        message: format!("Successfully saved {} codes", saved_codes.len()),
        saved_codes,
    }))
}

/// Clear all extracted codes
pub async fn clear_codes(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    state.store.clear()?;
    Ok(Json(MessageResponse {
        message: "All codes cleared successfully".to_string(),
    }))
}

/// Export all stored codes as a CSV download
pub async fn export_csv(State(state): State<AppState>) -> Result<Response, ApiError> {
    let codes = state.store.all()?;
    if codes.is_empty() {
        return Err(ApiError::BadRequest("No codes to export".to_string()));
    }

    tracing::info!("Generating CSV from {} codes", codes.len());
    let csv = codes_to_csv(codes.iter().map(|c| &c.record))?;
    let disposition = format!("attachment; filename=\"{}\"", CSV_FILE_NAME);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// Upload all stored codes to Azure Databricks
pub async fn upload_to_azure(
    State(state): State<AppState>,
    payload: Result<Json<DbfsConnection>, JsonRejection>,
) -> Result<Json<UploadOutcome>, ApiError> {
    let invalid = || ApiError::BadRequest("Invalid Azure connection details".to_string());
    let Json(connection) = payload.map_err(|_| invalid())?;
    if !connection.missing_fields().is_empty() {
        return Err(invalid());
    }

    let codes = state.store.all()?;
    if codes.is_empty() {
        return Err(ApiError::BadRequest("No codes to upload".to_string()));
    }

    let result = state
        .databricks
        .upload_codes(&connection, codes.iter().map(|c| &c.record))
        .await;
    Ok(Json(upload_outcome(result)))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<PdfUploadForm, ApiError> {
    let bad_body = |e: axum::extract::multipart::MultipartError| {
        ApiError::BadRequest(format!("Invalid upload: {}", e.body_text()))
    };

    let mut form = PdfUploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_body)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = Some(field.file_name().unwrap_or_default().to_string());
                form.file_bytes = Some(field.bytes().await.map_err(bad_body)?.to_vec());
            }
            "payer_name" => form.payer_name = field.text().await.map_err(bad_body)?,
            "line_of_business" => form.line_of_business = field.text().await.map_err(bad_body)?,
            "year" => form.year = Some(field.text().await.map_err(bad_body)?),
            other => tracing::debug!("Ignoring unexpected form field '{}'", other),
        }
    }
    Ok(form)
}

/// Blank or absent year means the current year.
fn parse_year(raw: Option<&str>) -> Result<i32, ApiError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Ok(chrono::Utc::now().year());
    }

    match raw.parse::<i32>() {
        Ok(year) if (MIN_YEAR..=MAX_YEAR).contains(&year) => Ok(year),
        _ => Err(ApiError::BadRequest(format!(
            "Year must be an integer between {} and {}",
            MIN_YEAR, MAX_YEAR
        ))),
    }
}

/// Reduces an uploaded file name to a safe ASCII base name.
fn secure_filename(name: &str) -> String {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        UNKNOWN_SOURCE.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::create_router;
    use crate::databricks::DatabricksClient;
    use crate::extractors::text::tests::build_pdf;
    use crate::extractors::DocumentProcessor;
    use crate::storage::{CodeStore, MemStore};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "payer-code-boundary";

    fn app_with_store() -> (Router, Arc<MemStore>) {
        let store = Arc::new(MemStore::new());
        let state = AppState {
            store: store.clone(),
            processor: Arc::new(DocumentProcessor::default()),
            databricks: DatabricksClient::new(Duration::from_secs(2)).unwrap(),
        };
        (create_router(state, 10 * 1024 * 1024), store)
    }

    fn seed(store: &MemStore) {
        let aetna = ExtractionMetadata::new("Aetna", 2024, "Medicare").with_source_file("aetna.pdf");
        let cigna = ExtractionMetadata::new("Cigna", 2023, "Commercial").with_source_file("cigna.pdf");
        store.save(crate::extractors::recognize_codes("99213 G0008", &aetna)).unwrap();
        store.save(crate::extractors::recognize_codes("0001U", &cigna)).unwrap();
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(fields: &[(&str, &str)], file: Option<(&str, Vec<u8>)>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                    BOUNDARY, file_name
                )
                .as_bytes(),
            );
            body.extend_from_slice(&bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/process-pdf")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\My Policy (2024).pdf"), "My_Policy_2024.pdf");
        assert_eq!(secure_filename("   "), "Unknown");
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year(Some("2022")).unwrap(), 2022);
        assert_eq!(parse_year(None).unwrap(), chrono::Utc::now().year());
        assert!(parse_year(Some("1999")).is_err());
        assert!(parse_year(Some("twenty")).is_err());
    }

    #[tokio::test]
    async fn test_process_pdf_stores_codes() {
        let (app, store) = app_with_store();
        let pdf = build_pdf(&["Covered: 99213, J0131-JW and 0002U"]);
        let request = multipart_request(
            &[("payer_name", "Aetna"), ("line_of_business", "Medicare"), ("year", "2024")],
            Some(("aetna policy.pdf", pdf)),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["message"], "Successfully processed aetna policy.pdf");
        let codes = body["extracted_codes"].as_array().unwrap();
        assert_eq!(codes.len(), 3);
        assert_eq!(codes[0]["id"], 1);
        assert_eq!(codes[0]["code"], "99213");
        assert_eq!(codes[1]["code_type"], "HCPCS");
        assert_eq!(codes[2]["source_file"], "aetna_policy.pdf");
        assert_eq!(store.all().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_process_pdf_validation() {
        let (app, _) = app_with_store();
        let meta = [("payer_name", "Aetna"), ("line_of_business", "Medicare")];

        let cases = vec![
            (multipart_request(&meta, None), "No file part"),
            (multipart_request(&meta, Some(("", b"%PDF".to_vec()))), "No file selected"),
            (
                multipart_request(&meta, Some(("notes.txt", b"hi".to_vec()))),
                "Only PDF files are allowed",
            ),
            (
                multipart_request(&[("payer_name", "Aetna")], Some(("a.pdf", b"%PDF".to_vec()))),
                "Metadata (payer name and line of business) is required",
            ),
        ];

        for (request, expected) in cases {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["error"], expected);
        }
    }

    #[tokio::test]
    async fn test_process_pdf_unreadable_document() {
        let (app, store) = app_with_store();
        let request = multipart_request(
            &[("payer_name", "Aetna"), ("line_of_business", "Medicare")],
            Some(("broken.pdf", b"definitely not a pdf".to_vec())),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = json_body(response).await["error"].as_str().unwrap().to_string();
        assert!(error.starts_with("Error processing PDF"), "{}", error);
        assert!(store.all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_and_distinct_lists() {
        let (app, store) = app_with_store();
        seed(&store);

        let body = json_body(app.clone().oneshot(get("/api/codes/search?term=992")).await.unwrap()).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let body = json_body(
            app.clone()
                .oneshot(get("/api/codes/search?payer=CIGNA&year=2023"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body[0]["code"], "0001U");

        let response = app
            .clone()
            .oneshot(get("/api/codes/search?term=&payer=&lob=&year="))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 3);

        let body = json_body(app.clone().oneshot(get("/api/codes/search?year=abc")).await.unwrap()).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let body = json_body(app.clone().oneshot(get("/api/payers")).await.unwrap()).await;
        assert_eq!(body, serde_json::json!(["Aetna", "Cigna"]));

        let body = json_body(app.oneshot(get("/api/lines-of-business")).await.unwrap()).await;
        assert_eq!(body, serde_json::json!(["Commercial", "Medicare"]));
    }

    #[tokio::test]
    async fn test_save_list_and_clear() {
        let (app, _) = app_with_store();

        let response = app.clone().oneshot(post_json("/api/codes", "[]")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = r#"[{"code":"99214","code_type":"CPT","payer_name":"Humana","year":2022,"line_of_business":"Medicaid"}]"#;
        let response = app.clone().oneshot(post_json("/api/codes", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let saved = json_body(response).await;
        assert_eq!(saved["message"], "Successfully saved 1 codes");
        assert_eq!(saved["saved_codes"][0]["source_file"], "Unknown");

        let listed = json_body(app.clone().oneshot(get("/api/codes")).await.unwrap()).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let delete = Request::builder()
            .method("DELETE")
            .uri("/api/codes")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(json_body(response).await["message"], "All codes cleared successfully");

        let listed = json_body(app.oneshot(get("/api/codes")).await.unwrap()).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_rejects_malformed_codes() {
        let (app, _) = app_with_store();
        let body = r#"[{"code":"99214","code_type":"ICD10"}]"#;
        let response = app.oneshot(post_json("/api/codes", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = json_body(response).await["error"].as_str().unwrap().to_string();
        assert!(error.starts_with("Invalid code data"), "{}", error);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let (app, store) = app_with_store();

        let response = app.clone().oneshot(get("/api/export-csv")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        seed(&store);
        let response = app.oneshot(get("/api/export-csv")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"extracted_codes.csv\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "code,code_type,payer_name,line_of_business,year,source_file");
        assert_eq!(lines[1], "99213,CPT,Aetna,Medicare,2024,aetna.pdf");
        assert_eq!(lines.len(), 4);
    }

    #[tokio::test]
    async fn test_upload_to_azure_validation() {
        let (app, store) = app_with_store();
        let connection = r#"{"workspace_url":"http://127.0.0.1:9","access_token":"t","directory_path":"/codes"}"#;

        let response = app
            .clone()
            .oneshot(post_json("/api/upload-to-azure", r#"{"workspace_url":"x"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid Azure connection details");

        let response = app
            .clone()
            .oneshot(post_json("/api/upload-to-azure", connection))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["error"], "No codes to upload");

        seed(&store);
        let response = app.oneshot(post_json("/api/upload-to-azure", connection)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = json_body(response).await;
        assert_eq!(outcome["success"], false);
        assert!(outcome["message"]
            .as_str()
            .unwrap()
            .starts_with("Error uploading to Azure Databricks"));
    }

    #[tokio::test]
    async fn test_lookup_route() {
        let (app, _) = app_with_store();
        let body = json_body(app.oneshot(get("/api/codes/J0131/lookup")).await.unwrap()).await;
        assert_eq!(body["code"], "J0131");
        assert_eq!(body["code_type"], "HCPCS");
        assert_eq!(body["category"], "Drugs (Injectable)");
        assert_eq!(body["subcategory"], "HCPCS Code");
    }
}
