//! Top-level entry points: scan, upload, assemble, summarise.
//!
//! ```text
//! image_dir ──▶ scan ──▶ batch (K workers, retry, checkpoint) ──▶ assemble ──▶ summary
//! ```
//!
//! The batch fully settles and its checkpoint is durable before assembly
//! begins, so a document-service failure never costs a re-upload: the next
//! run resumes from the checkpoint and only repeats the assembly.

use crate::assemble::assemble_document;
use crate::batch::run_batch;
use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::output::{PublishOutput, RunStats};
use crate::pipeline::checkpoint::CheckpointStore;
use crate::pipeline::document::{DocumentService, HttpDocumentService};
use crate::pipeline::scan::scan_images;
use crate::pipeline::summary::render_summary;
use crate::pipeline::upload::{HttpImageHost, ImageHost};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the whole job against the given remote clients.
///
/// # Returns
/// `Ok(PublishOutput)` whenever the batch settled and the summary was
/// written, even if every upload failed (check `output.stats`).
///
/// # Errors
/// Returns `Err(PublishError)` only for fatal errors:
/// - image directory missing, not a directory, or without images
/// - checkpoint unreadable or unwritable
/// - account / page creation or page edit refused by the service
/// - cancellation before the batch settled
pub async fn publish<H, S>(
    config: &PublishConfig,
    host: &H,
    service: &S,
    cancel: &CancellationToken,
) -> Result<PublishOutput, PublishError>
where
    H: ImageHost + ?Sized,
    S: DocumentService + ?Sized,
{
    let total_start = Instant::now();
    info!("Starting publish run '{}' from {}", config.page_id, config.image_dir.display());

    // ── Step 1: Scan ─────────────────────────────────────────────────────
    let tasks = scan_images(&config.image_dir)?;

    // ── Step 2: Upload (or resume) ───────────────────────────────────────
    let store = CheckpointStore::new(config.results_path());
    let upload_start = Instant::now();
    let batch = run_batch(&tasks, host, &store, config, cancel).await?;
    let upload_duration_ms = upload_start.elapsed().as_millis() as u64;

    let mut stats = RunStats::from_outcomes(&batch.outcomes, batch.resumed);
    stats.upload_duration_ms = upload_duration_ms;

    // ── Step 3: Assemble the page ────────────────────────────────────────
    let document = assemble_document(&batch.outcomes, service, config).await?;

    // ── Step 4: Summary ──────────────────────────────────────────────────
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    let summary = render_summary(&config.title, &batch.outcomes, &stats, document.as_ref());
    let summary_path = config.summary_path();
    write_atomic(&summary_path, summary.as_bytes()).await?;

    info!(
        "Run complete: {}/{} uploaded, {}ms total",
        stats.succeeded, stats.total, stats.total_duration_ms
    );

    Ok(PublishOutput {
        outcomes: batch.outcomes,
        stats,
        document,
        results_path: store.path().to_path_buf(),
        summary_path,
    })
}

/// Run the whole job against the real HTTP services named in `config`.
pub async fn publish_http(
    config: &PublishConfig,
    cancel: &CancellationToken,
) -> Result<PublishOutput, PublishError> {
    let client = http_client(config)?;
    let host = HttpImageHost::new(client.clone(), config);
    let service = HttpDocumentService::new(client, config);
    publish(config, &host, &service, cancel).await
}

/// Shared HTTP client honouring `request_timeout_secs`.
pub fn http_client(config: &PublishConfig) -> Result<reqwest::Client, PublishError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PublishError::HttpClient(e.to_string()))
}

/// Atomic write: write to temp, then rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PublishError> {
    let write_err = |e: std::io::Error| PublishError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomic_creates_parent_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/run.summary.md");

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("md.tmp").exists());
    }

    #[test]
    fn http_client_builds_from_defaults() {
        let config = PublishConfig::default();
        assert!(http_client(&config).is_ok());
    }
}
