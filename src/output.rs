//! Result types produced by a publish run.
//!
//! [`UploadOutcome`] is the unit persisted to the checkpoint file, so its
//! serde shape is a wire format: `{filename, url?, status, error?, retries}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One file queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    /// File name, unique within the batch.
    pub filename: String,
    /// Absolute or directory-relative path to the file.
    pub path: PathBuf,
}

impl UploadTask {
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
        }
    }
}

/// Terminal status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// Terminal result of a task's upload attempts.
///
/// `url` is present iff `status` is [`OutcomeStatus::Success`]; `error` is
/// present iff it is [`OutcomeStatus::Error`]. Use the constructors to keep
/// that pairing intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Retries consumed (attempts minus one).
    #[serde(default)]
    pub retries: u32,
}

impl UploadOutcome {
    pub fn success(filename: impl Into<String>, url: impl Into<String>, retries: u32) -> Self {
        Self {
            filename: filename.into(),
            url: Some(url.into()),
            status: OutcomeStatus::Success,
            error: None,
            retries,
        }
    }

    pub fn failure(filename: impl Into<String>, error: impl Into<String>, retries: u32) -> Self {
        Self {
            filename: filename.into(),
            url: None,
            status: OutcomeStatus::Error,
            error: Some(error.into()),
            retries,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// The URL of a successful outcome.
    pub fn success_url(&self) -> Option<&str> {
        match self.status {
            OutcomeStatus::Success => self.url.as_deref(),
            OutcomeStatus::Error => None,
        }
    }
}

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// True when outcomes came from an existing checkpoint and no upload ran.
    pub resumed: bool,
    pub upload_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl RunStats {
    pub fn from_outcomes(outcomes: &[UploadOutcome], resumed: bool) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            resumed,
            ..Default::default()
        }
    }
}

/// The assembled, published article.
#[derive(Clone, Serialize, Deserialize)]
pub struct PublishedDocument {
    /// Final public URL, as returned by the rewrite call.
    pub url: String,
    /// Path component assigned by the document service on creation.
    pub path: String,
    pub title: String,
    /// Secret token owning the page. Needed to edit it later.
    pub access_token: String,
}

impl fmt::Debug for PublishedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishedDocument")
            .field("url", &self.url)
            .field("path", &self.path)
            .field("title", &self.title)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Everything a caller needs after a run.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutput {
    pub outcomes: Vec<UploadOutcome>,
    pub stats: RunStats,
    /// `None` when no upload succeeded and assembly was skipped.
    pub document: Option<PublishedDocument>,
    /// Machine-readable result file (the checkpoint).
    pub results_path: PathBuf,
    /// Human-readable Markdown summary.
    pub summary_path: PathBuf,
}
