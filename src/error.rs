//! Error types for the gallery-publish library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PublishError`]: **Fatal**: the run cannot proceed (input directory
//!   missing, checkpoint unreadable, the document service refused to create
//!   an account or page). Returned as `Err(PublishError)` from the top-level
//!   `publish*` functions.
//!
//! * [`UploadError`]: **Non-fatal**: a single file failed to upload after
//!   all retries. Its message is stored inside
//!   [`crate::output::UploadOutcome`] and the rest of the batch carries on.
//!
//! Remote document failures are never retried: account and page creation
//! carry no idempotency key, so a blind retry could create duplicates.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the gallery-publish library.
///
/// Per-file upload failures use [`UploadError`] and are absorbed into
/// [`crate::output::UploadOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PublishError {
    // ── Scan errors ───────────────────────────────────────────────────────
    /// The image directory does not exist.
    #[error("Image directory not found: '{path}'\nCheck the path exists and is readable.")]
    DirectoryNotFound { path: PathBuf },

    /// The image path exists but is a regular file.
    #[error("'{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// The directory contains no files with a supported image extension.
    #[error("No images found in '{path}'\nSupported extensions: png, jpg, jpeg, gif, webp, bmp.")]
    NoImagesFound { path: PathBuf },

    /// Listing the directory failed for another reason.
    #[error("Failed to scan '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Document service errors ───────────────────────────────────────────
    /// `createAccount` returned a non-ok result.
    #[error("Account creation failed: {reason}")]
    AccountCreation { reason: String },

    /// `createPage` returned a non-ok result or an unusable page address.
    #[error("Page creation failed: {reason}")]
    PageCreation { reason: String },

    /// `editPage` returned a non-ok result.
    #[error("Page edit failed for '{path}': {reason}")]
    PageEdit { path: String, reason: String },

    // ── Checkpoint / output errors ────────────────────────────────────────
    /// Reading or writing the checkpoint file failed.
    #[error("Checkpoint I/O failed for '{path}': {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint file exists but is not a valid outcome list.
    #[error("Checkpoint '{path}' is corrupt: {detail}\nDelete it to force a fresh run.")]
    CheckpointCorrupt { path: PathBuf, detail: String },

    /// Could not create or write the summary document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Setup errors ──────────────────────────────────────────────────────
    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run was cancelled before every upload settled.
    #[error("Run cancelled; {settled}/{total} uploads had settled, no checkpoint written")]
    Cancelled { settled: usize, total: usize },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single upload attempt.
///
/// Every variant is retryable; once retries are exhausted the last one is
/// rendered into [`crate::output::UploadOutcome::error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The source file could not be read from disk.
    #[error("failed to read '{filename}': {detail}")]
    ReadFailed { filename: String, detail: String },

    /// Connection-level failure (DNS, TLS, reset).
    #[error("transport error: {detail}")]
    Transport { detail: String },

    /// The request exceeded the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The image host answered with a non-2xx status.
    #[error("image host returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// A 2xx response whose body was not a `[{"src": ...}]` list.
    #[error("malformed upload response: {detail}")]
    MalformedResponse { detail: String },

    /// The run was cancelled while this file was in flight.
    #[error("upload cancelled")]
    Cancelled,
}
