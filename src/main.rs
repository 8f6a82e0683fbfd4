// document-synthesis-service/src/main.rs

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use document_synthesis::{Config, DocumentService};
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.service.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    info!(
        service = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting Document Synthesis Service"
    );

    let input = read_request(std::env::args().nth(1)).await?;
    let output_dir = PathBuf::from(&config.output.dir);
    let service = DocumentService::new(config).context("Failed to initialize document service")?;

    let mut response = service.handle_request(&input).await;
    if response.status != "success" {
        error!(
            request_id = %response.request_id,
            error_type = ?response.error_type,
            "Request failed"
        );
        println!("{}", serde_json::to_string_pretty(&response)?);
        bail!(
            "document generation failed: {}",
            response.error.as_deref().unwrap_or("unknown error")
        );
    }

    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    for document in &mut response.documents {
        let path = write_document(&output_dir, &document.filename, &document.content_base64).await?;
        info!(path = %path.display(), size_bytes = document.size_bytes, "Document written");
        // The artifact is on disk; keep the printed summary small.
        document.content_base64.clear();
    }

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Request JSON from the path argument, or stdin when absent or `-`.
async fn read_request(path: Option<String>) -> Result<Vec<u8>> {
    match path.as_deref() {
        Some(path) if path != "-" => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read request file {path}")),
        _ => {
            let mut buffer = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buffer)
                .await
                .context("Failed to read request from stdin")?;
            Ok(buffer)
        }
    }
}

async fn write_document(dir: &Path, filename: &str, content_base64: &str) -> Result<PathBuf> {
    let bytes = general_purpose::STANDARD
        .decode(content_base64)
        .with_context(|| format!("Generated content for {filename} is not valid base64"))?;
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
