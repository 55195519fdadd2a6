//! Checkpoint store: durable snapshot of every outcome in a run.
//!
//! The file is one pretty-printed JSON array of
//! [`crate::output::UploadOutcome`]. It is written exactly once per run,
//! after the pool has settled, through a temp file in the same directory
//! followed by a rename, so a reader sees either the previous state
//! (absence) or the full list.

use crate::error::PublishError;
use crate::output::UploadOutcome;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-backed checkpoint for one run identity.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the stored outcome list, or `None` when no checkpoint exists.
    pub fn load(&self) -> Result<Option<Vec<UploadOutcome>>, PublishError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No checkpoint at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(PublishError::Checkpoint {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let outcomes: Vec<UploadOutcome> =
            serde_json::from_str(&raw).map_err(|e| PublishError::CheckpointCorrupt {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;

        info!(
            "Loaded checkpoint {} ({} outcomes)",
            self.path.display(),
            outcomes.len()
        );
        Ok(Some(outcomes))
    }

    /// Atomically replace the checkpoint with `outcomes`.
    pub fn save(&self, outcomes: &[UploadOutcome]) -> Result<(), PublishError> {
        let io_err = |e: std::io::Error| PublishError::Checkpoint {
            path: self.path.clone(),
            source: e,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let json = serde_json::to_vec_pretty(outcomes)
            .map_err(|e| PublishError::Internal(format!("checkpoint serialisation: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        info!(
            "Saved checkpoint {} ({} outcomes)",
            self.path.display(),
            outcomes.len()
        );
        Ok(())
    }
}
