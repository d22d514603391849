//! State module for tracking ingestion progress
//!
//! This module provides the durable repositories the crawl relies on to resume
//! after an interruption, plus the row outcome vocabulary they record.
//!
//! # Components
//!
//! - `HistoryStore`: append-only set of identifiers confirmed in remote storage
//! - `FailureLedger`: append-only `identifier|reason` log of failed rows
//! - `ProgressTracker`: single JSON snapshot overwritten after every row
//! - `RowOutcome` / `SkipReason`: what happened to a catalog row

mod failures;
mod history;
mod progress;
mod row_state;

// Re-export main types
pub use failures::FailureLedger;
pub use history::HistoryStore;
pub use progress::{ProgressSnapshot, ProgressTracker, RunPhase};
pub use row_state::{RowOutcome, SkipReason};

use crate::config::PathsConfig;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing durable state
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for state persistence operations
pub type PersistResult<T> = Result<T, PersistError>;

/// The durable repositories a crawl writes to, injected into the coordinator
#[derive(Debug)]
pub struct StateStores {
    pub history: HistoryStore,
    pub failures: FailureLedger,
    pub progress: ProgressTracker,
}

impl StateStores {
    /// Opens history and failure files and prepares the progress snapshot
    pub fn open(paths: &PathsConfig) -> PersistResult<Self> {
        Ok(Self {
            history: HistoryStore::open(Path::new(&paths.history_file))?,
            failures: FailureLedger::open(Path::new(&paths.failure_file))?,
            progress: ProgressTracker::new(Path::new(&paths.progress_file)),
        })
    }
}

/// Replaces a file's contents atomically
///
/// The bytes are written to a temp file in the same directory, synced, and
/// renamed over the target, so readers only ever see the old or the new
/// contents.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> PersistResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))?;

    let mut temp_file =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| PersistError::io(parent, e))?;
    temp_file
        .write_all(bytes)
        .map_err(|e| PersistError::io(path, e))?;
    temp_file.flush().map_err(|e| PersistError::io(path, e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| PersistError::io(path, e))?;
    temp_file
        .persist(path)
        .map_err(|e| PersistError::io(path, e.error))?;

    Ok(())
}

/// Opens a file for appending, creating it and its parent directory if needed
pub(crate) fn open_append(path: &Path) -> PersistResult<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PersistError::io(path, e))
}

/// Reads a file line by line, treating a missing file as empty
pub(crate) fn read_lines(path: &Path) -> PersistResult<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(PersistError::io(path, e)),
    }
}
