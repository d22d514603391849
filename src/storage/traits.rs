//! Storage traits and error types
//!
//! This module defines the trait interface for the run ledger backend and
//! associated error types.

use crate::storage::{RunCounters, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during run ledger operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run ledger implementations
///
/// The ledger is advisory: it records what each invocation did and is read
/// back for `--stats`, but crawl decisions never consult it.
pub trait Storage {
    /// Creates a new run in the `running` state and returns its ID
    fn create_run(&mut self, config_hash: &str, mode: &str) -> StorageResult<i64>;

    /// Marks runs left in the `running` state by a killed process as interrupted
    ///
    /// Returns the number of runs updated.
    fn mark_interrupted_runs(&mut self) -> StorageResult<usize>;

    /// Records the final status and counters of a run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counters: &RunCounters,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Lists the most recent runs, newest first
    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;
}
