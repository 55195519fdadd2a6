//! Upload pipeline: bounded-concurrency pool with checkpoint resumption.
//!
//! ## Scheduling
//!
//! The task list is drained through `buffer_unordered(concurrency)`: at most
//! `concurrency` files are in their retry state machine at any moment, and a
//! new file starts only when one settles. Each future carries its input
//! index, so outcomes land in their own slot and the returned list follows
//! input order regardless of completion order.
//!
//! ## Resumption
//!
//! Before any upload, the checkpoint for this page id is consulted. Under
//! [`ResumePolicy::Trust`] an existing checkpoint is returned verbatim and
//! no upload is attempted, even if every stored outcome is an error.
//! The checkpoint is written once, after every task has settled.

use crate::config::{PublishConfig, ResumePolicy};
use crate::error::PublishError;
use crate::output::{UploadOutcome, UploadTask};
use crate::pipeline::checkpoint::CheckpointStore;
use crate::pipeline::upload::{settle_upload, ImageHost, Settled};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Settled outcomes of one batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// One outcome per task, in task order.
    pub outcomes: Vec<UploadOutcome>,
    /// True when the outcomes were read from the checkpoint.
    pub resumed: bool,
}

/// Upload every task (or resume from the checkpoint) and persist the result.
///
/// # Errors
/// - [`PublishError::Checkpoint`] / [`PublishError::CheckpointCorrupt`] when
///   the checkpoint cannot be read or written
/// - [`PublishError::Cancelled`] when `cancel` fired before the pool
///   drained; nothing is persisted in that case
///
/// Individual upload failures never surface here; they are recorded as
/// `error` outcomes.
pub async fn run_batch<H>(
    tasks: &[UploadTask],
    host: &H,
    store: &CheckpointStore,
    config: &PublishConfig,
    cancel: &CancellationToken,
) -> Result<BatchResult, PublishError>
where
    H: ImageHost + ?Sized,
{
    if let Some(stored) = store.load()? {
        if should_resume(&stored, config.resume_policy) {
            info!(
                "Resuming from checkpoint {}: {} outcomes, no uploads",
                store.path().display(),
                stored.len()
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_resumed(stored.len());
            }
            return Ok(BatchResult {
                outcomes: stored,
                resumed: true,
            });
        }
        info!(
            "Checkpoint {} holds no success; re-running batch",
            store.path().display()
        );
    }

    let total = tasks.len();
    info!(
        "Uploading {} files, concurrency {}, max retries {}",
        total, config.concurrency, config.max_retries
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let settlements = upload_all(tasks, host, config, cancel).await;

    // Only outcomes cut short by the token make the run cancelled.
    let settled = settlements.iter().filter(|s| !s.cancelled).count();
    if settled < total {
        warn!("Upload cancelled after {}/{} files settled", settled, total);
        return Err(PublishError::Cancelled { settled, total });
    }
    let outcomes: Vec<UploadOutcome> = settlements.into_iter().map(|s| s.outcome).collect();

    store.save(&outcomes)?;

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    info!("Upload finished: {}/{} succeeded", succeeded, total);
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, succeeded);
    }

    Ok(BatchResult {
        outcomes,
        resumed: false,
    })
}

/// Decide whether a stored outcome list satisfies this run.
pub fn should_resume(stored: &[UploadOutcome], policy: ResumePolicy) -> bool {
    match policy {
        ResumePolicy::Trust => true,
        ResumePolicy::RetryIfAllFailed => stored.iter().any(|o| o.is_success()),
    }
}

/// Drain `tasks` through a pool of at most `config.concurrency` uploads.
async fn upload_all<H>(
    tasks: &[UploadTask],
    host: &H,
    config: &PublishConfig,
    cancel: &CancellationToken,
) -> Vec<Settled>
where
    H: ImageHost + ?Sized,
{
    let total = tasks.len();
    let mut slots: Vec<Option<Settled>> = vec![None; total];
    let mut settled = 0usize;

    let mut pool = stream::iter(tasks.iter().enumerate().map(move |(idx, task)| async move {
        if let Some(ref cb) = config.progress_callback {
            cb.on_task_start(idx, &task.filename);
        }
        let settlement = settle_upload(host, task, config, cancel).await;
        (idx, settlement)
    }))
    .buffer_unordered(config.concurrency.max(1));

    while let Some((idx, settlement)) = pool.next().await {
        settled += 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_task_settled(settled, total, &settlement.outcome);
        }
        slots[idx] = Some(settlement);
    }

    // buffer_unordered drains every future, so each slot is filled.
    slots
        .into_iter()
        .zip(tasks)
        .map(|(slot, task)| slot.unwrap_or_else(|| Settled {
            outcome: UploadOutcome::failure(&task.filename, "upload never settled", 0),
            cancelled: false,
        }))
        .collect()
}
