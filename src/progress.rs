//! Progress-callback trait for per-file upload events.
//!
//! Inject an [`Arc<dyn UploadProgressCallback>`] via
//! [`crate::config::PublishConfigBuilder::progress_callback`] to receive
//! events as the upload pool settles each file.
//!
//! # Example
//!
//! ```rust
//! use gallery_publish::{PublishConfig, UploadOutcome, UploadProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     settled: AtomicUsize,
//! }
//!
//! impl UploadProgressCallback for CountingCallback {
//!     fn on_task_settled(&self, settled: usize, total: usize, outcome: &UploadOutcome) {
//!         self.settled.store(settled, Ordering::SeqCst);
//!         eprintln!("{}/{} {}", settled, total, outcome.filename);
//!     }
//! }
//!
//! let config = PublishConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { settled: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::UploadOutcome;
use std::sync::Arc;

/// Called by the upload pool as files move through their retry state machine.
///
/// Implementations must be `Send + Sync`: `on_task_start` and `on_retry`
/// fire from concurrently running uploads. `on_task_settled` is always
/// called from the single task draining the pool, in completion order, with
/// a strictly increasing `settled` count.
pub trait UploadProgressCallback: Send + Sync {
    /// Called once before the first upload starts.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called instead of the per-file events when a checkpoint satisfied the run.
    fn on_resumed(&self, total: usize) {
        let _ = total;
    }

    /// Called when a file enters its first attempt.
    ///
    /// # Arguments
    /// * `index`   : 0-indexed position in the batch
    /// * `filename`: file being uploaded
    fn on_task_start(&self, index: usize, filename: &str) {
        let _ = (index, filename);
    }

    /// Called after a failed attempt, before the retry delay.
    ///
    /// # Arguments
    /// * `retry`      : 1-indexed number of the retry about to happen
    /// * `max_retries`: configured retry budget
    /// * `error`      : the failure that triggered the retry
    fn on_retry(&self, filename: &str, retry: u32, max_retries: u32, error: &str) {
        let _ = (filename, retry, max_retries, error);
    }

    /// Called when a file reaches a terminal state.
    ///
    /// `settled / total` is the completed fraction of the batch.
    fn on_task_settled(&self, settled: usize, total: usize, outcome: &UploadOutcome) {
        let _ = (settled, total, outcome);
    }

    /// Called once after every file has settled.
    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl UploadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PublishConfig`].
pub type ProgressCallback = Arc<dyn UploadProgressCallback>;
