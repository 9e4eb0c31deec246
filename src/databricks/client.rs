// src/databricks/client.rs
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header;

use crate::databricks::models::{DbfsConnection, DbfsPutRequest, UploadOutcome};
use crate::export::{codes_to_csv, CSV_FILE_NAME};
use crate::extractors::codes::CodeRecord;
use crate::utils::error::DatabricksError;

/// Uploads code exports to DBFS through the workspace REST API.
#[derive(Clone)]
pub struct DatabricksClient {
    http: reqwest::Client,
}

impl DatabricksClient {
    pub fn new(timeout: Duration) -> Result<Self, DatabricksError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Builds the `dbfs/put` body for a CSV export of `codes`.
    pub fn build_put_request<'p, 'c, I>(
        path: &'p str,
        codes: I,
    ) -> Result<DbfsPutRequest<'p>, DatabricksError>
    where
        I: IntoIterator<Item = &'c CodeRecord>,
    {
        let csv = codes_to_csv(codes)?;
        Ok(DbfsPutRequest {
            path,
            contents: STANDARD.encode(csv.as_bytes()),
            overwrite: true,
        })
    }

    /// Writes `codes` as `extracted_codes.csv` under the connection's
    /// directory, overwriting any previous export. Returns the DBFS path.
    pub async fn upload_codes<'a, I>(
        &self,
        connection: &DbfsConnection,
        codes: I,
    ) -> Result<String, DatabricksError>
    where
        I: IntoIterator<Item = &'a CodeRecord>,
    {
        let path = connection.file_path(CSV_FILE_NAME);
        let url = connection.put_url();
        let payload = Self::build_put_request(&path, codes)?;

        tracing::info!("Uploading codes to DBFS: {}", path);
        tracing::debug!("DBFS put endpoint: {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&connection.access_token)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await?; // Propagates reqwest::Error as DatabricksError::Network

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("DBFS upload rejected with {}: {}", status, body);
            return Err(DatabricksError::Rejected { status, body });
        }

        tracing::info!("Uploaded codes to {}", path);
        Ok(path)
    }
}

/// Maps an upload result to the `{success, message}` shape the UI expects.
pub fn upload_outcome(result: Result<String, DatabricksError>) -> UploadOutcome {
    match result {
        Ok(path) => UploadOutcome {
            success: true,
            message: format!("Codes successfully uploaded to Azure Databricks at {}", path),
        },
        Err(DatabricksError::Rejected { body, .. }) => UploadOutcome {
            success: false,
            message: format!("Failed to upload to Azure Databricks: {}", body),
        },
        Err(e) => UploadOutcome {
            success: false,
            message: format!("Error uploading to Azure Databricks: {}", e),
        },
    }
}
