//! Storage module for the run ledger
//!
//! Every invocation is recorded in a small SQLite database: when it started
//! and finished, which mode ran, the hash of the configuration it ran with,
//! how it ended and its counters. `--stats` reads this back.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::fmt;
use std::path::Path;

/// Initializes or opens a run ledger database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a recorded run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub mode: String,
    pub status: RunStatus,
    pub counters: RunCounters,
    pub error_message: Option<String>,
}

/// Counters stored with a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub pages_scanned: u32,
    pub new_downloads: u64,
    pub skipped_already: u64,
    pub skipped_excluded: u64,
    pub skipped_failed: u64,
    pub failed: u64,
    pub upload_failures: u64,
    pub purged: u64,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Too many consecutive empty pages
    Stalled,
    /// Navigation failed; a diagnostic snapshot was saved
    Aborted,
    /// The process died without finishing the run
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stalled => "stalled",
            Self::Aborted => "aborted",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "stalled" => Some(Self::Stalled),
            "aborted" => Some(Self::Aborted),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
