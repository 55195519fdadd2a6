//! Image host interaction: send one file, retry on failure.
//!
//! [`ImageHost`] is the seam between the batch pool and the network. The
//! production implementation, [`HttpImageHost`], posts a multipart form to
//! `{base_url}/upload` and expects `[{"src": "/file/abc.png"}]` back.
//!
//! ## Retry Strategy
//!
//! Every upload failure is treated as transient. Each file runs its own
//! state machine: `Attempting → {Success, RetryWait, Exhausted}` with a flat
//! `retry_delay_ms` wait between attempts (no jitter, no backoff). Retry
//! waits only suspend the worker that owns the file.

use crate::config::PublishConfig;
use crate::error::{PublishError, UploadError};
use crate::output::{UploadOutcome, UploadTask};
use crate::pipeline::scan::mime_for;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Something that can turn a local file into a durable public URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload one file. Every error is retryable.
    async fn upload(&self, task: &UploadTask) -> Result<String, UploadError>;
}

/// [`ImageHost`] backed by an HTTP `POST {base_url}/upload` endpoint.
pub struct HttpImageHost {
    client: reqwest::Client,
    base_url: String,
    endpoint: String,
    timeout_secs: u64,
}

impl HttpImageHost {
    pub fn new(client: reqwest::Client, config: &PublishConfig) -> Self {
        Self {
            client,
            base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            endpoint: config.upload_endpoint(),
            timeout_secs: config.request_timeout_secs,
        }
    }

    /// Build a host with its own client.
    pub fn from_config(config: &PublishConfig) -> Result<Self, PublishError> {
        let client = crate::publish::http_client(config)?;
        Ok(Self::new(client, config))
    }

    fn map_transport(&self, e: reqwest::Error) -> UploadError {
        if e.is_timeout() {
            UploadError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            UploadError::Transport {
                detail: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl ImageHost for HttpImageHost {
    async fn upload(&self, task: &UploadTask) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(&task.path)
            .await
            .map_err(|e| UploadError::ReadFailed {
                filename: task.filename.clone(),
                detail: e.to_string(),
            })?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(task.filename.clone())
            .mime_str(mime_for(&task.filename))
            .map_err(|e| UploadError::Transport {
                detail: e.to_string(),
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(UploadError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        parse_upload_response(&self.base_url, &body)
    }
}

#[derive(Deserialize)]
struct UploadedFile {
    src: String,
}

/// Turn a successful response body into the final URL (`base_url + src`).
pub fn parse_upload_response(base_url: &str, body: &str) -> Result<String, UploadError> {
    let files: Vec<UploadedFile> =
        serde_json::from_str(body).map_err(|e| UploadError::MalformedResponse {
            detail: format!("{e}; body: {}", truncate(body, 200)),
        })?;

    let first = files
        .into_iter()
        .next()
        .ok_or_else(|| UploadError::MalformedResponse {
            detail: "empty file list".to_string(),
        })?;

    let base = base_url.trim_end_matches('/');
    if first.src.starts_with('/') {
        Ok(format!("{}{}", base, first.src))
    } else {
        Ok(format!("{}/{}", base, first.src))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}\u{2026}")
    }
}

/// Terminal state of one file's retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub outcome: UploadOutcome,
    /// True when the cancellation token cut the loop short; the outcome is
    /// then an `error` that says nothing about the file itself.
    pub cancelled: bool,
}

impl Settled {
    fn done(outcome: UploadOutcome) -> Self {
        Self {
            outcome,
            cancelled: false,
        }
    }

    fn cancelled(filename: &str, retries: u32) -> Self {
        Self {
            outcome: UploadOutcome::failure(filename, UploadError::Cancelled.to_string(), retries),
            cancelled: true,
        }
    }
}

/// Drive one file through its retry state machine to a terminal outcome.
///
/// Never returns an error: exhaustion and cancellation both settle as an
/// `error` outcome carrying the last observed failure. `retries` counts the
/// attempts after the first one.
pub async fn upload_with_retry<H>(
    host: &H,
    task: &UploadTask,
    config: &PublishConfig,
    cancel: &CancellationToken,
) -> UploadOutcome
where
    H: ImageHost + ?Sized,
{
    settle_upload(host, task, config, cancel).await.outcome
}

/// [`upload_with_retry`], also reporting whether cancellation ended the loop.
pub async fn settle_upload<H>(
    host: &H,
    task: &UploadTask,
    config: &PublishConfig,
    cancel: &CancellationToken,
) -> Settled
where
    H: ImageHost + ?Sized,
{
    let mut last_err = UploadError::Cancelled;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_millis(config.retry_delay_ms);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("{}: cancelled while waiting to retry", task.filename);
                    return Settled::cancelled(&task.filename, attempt - 1);
                }
                _ = sleep(delay) => {}
            }
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UploadError::Cancelled),
            r = host.upload(task) => r,
        };

        match result {
            Ok(url) => {
                info!("{}: uploaded after {} retries → {}", task.filename, attempt, url);
                return Settled::done(UploadOutcome::success(&task.filename, url, attempt));
            }
            Err(UploadError::Cancelled) => {
                debug!("{}: cancelled during attempt {}", task.filename, attempt + 1);
                return Settled::cancelled(&task.filename, attempt);
            }
            Err(e) => {
                if attempt < config.max_retries {
                    warn!(
                        "{}: attempt {} failed: {}; retry {}/{} in {}ms",
                        task.filename,
                        attempt + 1,
                        e,
                        attempt + 1,
                        config.max_retries,
                        config.retry_delay_ms
                    );
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_retry(&task.filename, attempt + 1, config.max_retries, &e.to_string());
                    }
                } else {
                    warn!("{}: attempt {} failed: {}", task.filename, attempt + 1, e);
                }
                last_err = e;
            }
        }
    }

    warn!(
        "{}: giving up after {} retries: {}",
        task.filename, config.max_retries, last_err
    );
    Settled::done(UploadOutcome::failure(
        &task.filename,
        last_err.to_string(),
        config.max_retries,
    ))
}
