// src/main.rs
mod api;
mod databricks;
mod export;
mod extractors;
mod storage;
mod utils;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;
use clap::{Parser, Subcommand};

use api::{create_router, AppState};
use databricks::{DatabricksClient, DbfsConnection};
use extractors::{recognize_codes, BlankTextPolicy, DocumentProcessor, ExtractionMetadata};
use storage::MemStore;
use utils::AppError;

/// Extracts CPT, HCPCS and PLA codes from payer policy PDFs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, env = "PORT", default_value_t = 5001)]
        port: u16,

        /// Maximum accepted request body in bytes
        #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
        max_upload_bytes: usize,

        /// Keep blank text from the layout extractor instead of retrying with lopdf
        #[arg(long, env = "ACCEPT_BLANK_PRIMARY")]
        accept_blank_primary: bool,

        /// Timeout for Databricks uploads
        #[arg(long, env = "UPLOAD_TIMEOUT_SECS", default_value_t = 30)]
        upload_timeout_secs: u64,
    },

    /// Extract codes from a local PDF and write them as CSV
    Extract {
        /// Path to the PDF document
        pdf: PathBuf,

        #[arg(long)]
        payer: String,

        #[arg(long)]
        line_of_business: String,

        /// Reporting year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,

        /// CSV output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save extracted text and a match report here
        #[arg(long)]
        debug_dir: Option<PathBuf>,

        #[arg(long)]
        accept_blank_primary: bool,
    },

    /// Upload a previously exported CSV to DBFS
    Upload {
        /// CSV written by `extract` or the export endpoint
        csv: PathBuf,

        #[arg(long, env = "DATABRICKS_HOST")]
        workspace_url: String,

        #[arg(long, env = "DATABRICKS_TOKEN", hide_env_values = true)]
        access_token: String,

        #[arg(long)]
        directory_path: String,

        #[arg(long, env = "UPLOAD_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,
    },
}

fn blank_policy(accept_blank_primary: bool) -> BlankTextPolicy {
    if accept_blank_primary {
        BlankTextPolicy::Accept
    } else {
        BlankTextPolicy::Fallback
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Reads RUST_LOG
    utils::logging::setup_logging();

    let args = Args::parse();
    tracing::debug!("Parsed args: {:?}", args.command);

    match args.command {
        Command::Serve {
            host,
            port,
            max_upload_bytes,
            accept_blank_primary,
            upload_timeout_secs,
        } => {
            let state = AppState {
                store: Arc::new(MemStore::new()),
                processor: Arc::new(DocumentProcessor::with_blank_policy(blank_policy(
                    accept_blank_primary,
                ))),
                databricks: DatabricksClient::new(Duration::from_secs(upload_timeout_secs))?,
            };
            serve(state, &host, port, max_upload_bytes).await
        }
        Command::Extract {
            pdf,
            payer,
            line_of_business,
            year,
            output,
            debug_dir,
            accept_blank_primary,
        } => {
            let year = year.unwrap_or_else(|| chrono::Utc::now().year());
            let processor = DocumentProcessor::with_blank_policy(blank_policy(accept_blank_primary));
            extract(
                &processor,
                &pdf,
                ExtractionMetadata::new(&payer, year, &line_of_business),
                output.as_deref(),
                debug_dir.as_deref(),
            )
        }
        Command::Upload {
            csv,
            workspace_url,
            access_token,
            directory_path,
            timeout_secs,
        } => {
            let connection = DbfsConnection {
                workspace_url,
                access_token,
                directory_path,
            };
            upload(&connection, &csv, Duration::from_secs(timeout_secs)).await
        }
    }
}

async fn serve(state: AppState, host: &str, port: u16, max_upload_bytes: usize) -> Result<(), AppError> {
    let app = create_router(state, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn extract(
    processor: &DocumentProcessor,
    pdf: &Path,
    metadata: ExtractionMetadata,
    output: Option<&Path>,
    debug_dir: Option<&Path>,
) -> Result<(), AppError> {
    let source_file = pdf
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| extractors::codes::UNKNOWN_SOURCE.to_string());
    let metadata = metadata.with_source_file(&source_file);

    let bytes = std::fs::read(pdf)?;
    tracing::info!("Read {} ({} bytes)", pdf.display(), bytes.len());

    let text = processor.extract_text(&bytes)?;
    if let Some(dir) = debug_dir {
        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        utils::text_debug::save_debug_text(&text, dir, &stem)?;
        utils::text_debug::save_match_report(&text, dir, &stem)?;
    }

    let codes = recognize_codes(&text, &metadata);
    tracing::info!("Extracted {} codes from {}", codes.len(), source_file);

    match output {
        Some(path) => {
            export::write_codes_csv(File::create(path)?, &codes)?;
            tracing::info!("Wrote CSV to {}", path.display());
        }
        None => export::write_codes_csv(std::io::stdout().lock(), &codes)?,
    }
    Ok(())
}

async fn upload(connection: &DbfsConnection, csv: &Path, timeout: Duration) -> Result<(), AppError> {
    let missing = connection.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::Config(format!(
            "Missing Databricks settings: {}",
            missing.join(", ")
        )));
    }

    let codes = export::read_codes_csv(File::open(csv)?)?;
    if codes.is_empty() {
        return Err(AppError::Config(format!("No codes found in {}", csv.display())));
    }

    let client = DatabricksClient::new(timeout)?;
    let path = client.upload_codes(connection, &codes).await?;
    tracing::info!("Uploaded {} codes to {}", codes.len(), path);
    Ok(())
}
