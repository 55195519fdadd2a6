//! # gallery-publish
//!
//! Batch-upload a directory of images to an image host, then publish the
//! resulting URLs as one shareable article on a document service.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image_dir
//!  │
//!  ├─ 1. Scan      list png/jpg/gif/webp/bmp files, sorted by name
//!  ├─ 2. Upload    bounded pool of K concurrent uploads, flat-delay retry
//!  ├─ 3. Persist   outcome list written once as the checkpoint / result file
//!  ├─ 4. Assemble  createAccount → createPage(provisional) → editPage(final)
//!  └─ 5. Summary   Markdown report with page URL and access token
//! ```
//!
//! A re-run with the same page id finds the checkpoint and performs no
//! upload at all; only assembly and the summary are repeated.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gallery_publish::{publish_http, PublishConfig};
//! use gallery_publish::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PublishConfig::builder()
//!         .image_dir("./photos")
//!         .page_id("trip-2026")
//!         .title("Summer trip")
//!         .build()?;
//!     let output = publish_http(&config, &CancellationToken::new()).await?;
//!     println!("{}/{} uploaded", output.stats.succeeded, output.stats.total);
//!     if let Some(doc) = output.document {
//!         println!("{}", doc.url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gallery-publish` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod publish;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{assemble_document, provisional_title};
pub use batch::{run_batch, BatchResult};
pub use config::{PublishConfig, PublishConfigBuilder, ResumePolicy};
pub use error::{PublishError, UploadError};
pub use output::{OutcomeStatus, PublishOutput, PublishedDocument, RunStats, UploadOutcome, UploadTask};
pub use pipeline::checkpoint::CheckpointStore;
pub use pipeline::document::{DocumentService, HttpDocumentService, NewPage, Node, PageEdit};
pub use pipeline::upload::{HttpImageHost, ImageHost};
pub use progress::{NoopProgressCallback, ProgressCallback, UploadProgressCallback};
pub use publish::{publish, publish_http};
pub use tokio_util::sync::CancellationToken;
