//! Pipeline stages for a publish run.
//!
//! Each submodule implements one step or one remote boundary, so each is
//! testable on its own and the HTTP clients can be swapped for fakes.
//!
//! ## Data Flow
//!
//! ```text
//! scan ──▶ upload ──▶ checkpoint ──▶ document ──▶ summary
//! (dir)    (host)     (JSON file)    (service)    (Markdown)
//! ```
//!
//! 1. [`scan`]      : list image files in the input directory, sorted
//! 2. [`upload`]    : one file to the image host, with the per-file retry
//!    state machine; the only stage with concurrent network I/O
//! 3. [`checkpoint`]: persist / reload the settled outcome list atomically
//! 4. [`document`]  : content-node tree and the document service client
//! 5. [`summary`]   : render the human-readable Markdown report

pub mod checkpoint;
pub mod document;
pub mod scan;
pub mod summary;
pub mod upload;

#[cfg(test)]
pub(crate) mod http_stub;
