pub mod client;
pub mod models;

pub use client::{upload_outcome, DatabricksClient};
pub use models::{DbfsConnection, UploadOutcome};
