//! Progress snapshot persistence
//!
//! The snapshot is a single JSON document that is overwritten after every row
//! decision. It is advisory: an external monitor polls it and operators use it
//! to see where a crashed run stopped, but resumption itself is driven by the
//! history store.

use crate::state::{write_atomic, PersistError, PersistResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Lifecycle phase recorded in the snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Running,
    Completed,
    Stalled,
    Aborted,
}

/// Current resumption point and running totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Approximate catalog size reported by the navigator (0 if unknown)
    pub total_approx: u64,

    /// Identifiers confirmed in storage, including earlier runs
    pub processed_count: u64,

    /// Rows skipped this session because they are excluded
    pub skipped_excluded: u64,

    /// Rows skipped this session because they were already ingested
    #[serde(default)]
    pub skipped_already: u64,

    /// Rows skipped this session because they failed in an earlier run
    #[serde(default)]
    pub skipped_failed: u64,

    /// Rows that failed this session
    #[serde(default)]
    pub failed_count: u64,

    /// Artifacts uploaded this session
    #[serde(default)]
    pub new_downloads: u64,

    #[serde(default)]
    pub files_left_approx: u64,

    /// One-based page number
    pub current_page: u32,

    /// Zero-based row index within the current page
    pub current_row: u32,

    #[serde(default)]
    pub status: RunPhase,

    #[serde(default)]
    pub updated_at: String,
}

/// Owns the progress snapshot and its file
#[derive(Debug)]
pub struct ProgressTracker {
    path: PathBuf,
    snapshot: ProgressSnapshot,
}

impl ProgressTracker {
    /// Creates a tracker that starts from an empty snapshot
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            snapshot: ProgressSnapshot::default(),
        }
    }

    /// Reads the snapshot last written to `path`, if any
    pub fn load(path: &Path) -> PersistResult<Option<ProgressSnapshot>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::io(path, e)),
        }
    }

    /// The in-memory snapshot
    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    /// Applies a mutation and overwrites the snapshot file
    pub fn update<F>(&mut self, mutate: F) -> PersistResult<()>
    where
        F: FnOnce(&mut ProgressSnapshot),
    {
        mutate(&mut self.snapshot);

        let snapshot = &mut self.snapshot;
        snapshot.files_left_approx = snapshot
            .total_approx
            .saturating_sub(snapshot.processed_count)
            .saturating_sub(snapshot.skipped_excluded);
        snapshot.updated_at = chrono::Utc::now().to_rfc3339();

        let json = serde_json::to_vec_pretty(&self.snapshot)?;
        write_atomic(&self.path, &json)
    }
}
