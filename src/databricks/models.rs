// src/databricks/models.rs
use serde::{Deserialize, Serialize};

/// Connection details for an Azure Databricks workspace, as posted by the UI.
#[derive(Debug, Clone, Deserialize)]
pub struct DbfsConnection {
    #[serde(default)]
    pub workspace_url: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub directory_path: String,
}

impl DbfsConnection {
    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("workspace_url", &self.workspace_url),
            ("access_token", &self.access_token),
            ("directory_path", &self.directory_path),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// The DBFS `put` endpoint of this workspace.
    pub fn put_url(&self) -> String {
        format!("{}/api/2.0/dbfs/put", self.workspace_url.trim_end_matches('/'))
    }

    /// Destination path of `file_name` inside the configured directory.
    pub fn file_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.directory_path.trim_end_matches('/'), file_name)
    }
}

/// Body of `POST /api/2.0/dbfs/put`. `contents` is base64 encoded.
#[derive(Debug, Serialize)]
pub struct DbfsPutRequest<'a> {
    pub path: &'a str,
    pub contents: String,
    pub overwrite: bool,
}

/// Result reported back to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub message: String,
}
