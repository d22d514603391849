//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunCounters, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, mode, status, \
     pages_scanned, new_downloads, skipped_already, skipped_excluded, skipped_failed, \
     failed, upload_failures, purged, error_message";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the ledger at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        mode: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Failed),
        counters: RunCounters {
            pages_scanned: row.get(6)?,
            new_downloads: row.get::<_, i64>(7)? as u64,
            skipped_already: row.get::<_, i64>(8)? as u64,
            skipped_excluded: row.get::<_, i64>(9)? as u64,
            skipped_failed: row.get::<_, i64>(10)? as u64,
            failed: row.get::<_, i64>(11)? as u64,
            upload_failures: row.get::<_, i64>(12)? as u64,
            purged: row.get::<_, i64>(13)? as u64,
        },
        error_message: row.get(14)?,
    })
}

impl Storage for SqliteStorage {
    fn create_run(&mut self, config_hash: &str, mode: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, mode, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, mode, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn mark_interrupted_runs(&mut self) -> StorageResult<usize> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE status = ?2",
            params![
                RunStatus::Interrupted.to_db_string(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(updated)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counters: &RunCounters,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_scanned = ?3,
             new_downloads = ?4, skipped_already = ?5, skipped_excluded = ?6,
             skipped_failed = ?7, failed = ?8, upload_failures = ?9, purged = ?10,
             error_message = ?11
             WHERE id = ?12",
            params![
                status.to_db_string(),
                now,
                counters.pages_scanned,
                counters.new_downloads as i64,
                counters.skipped_already as i64,
                counters.skipped_excluded as i64,
                counters.skipped_failed as i64,
                counters.failed as i64,
                counters.upload_failures as i64,
                counters.purged as i64,
                error_message,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS))?;

        let run = stmt
            .query_row(params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        Ok(run)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        let run = stmt.query_row([], run_from_row).optional()?;

        Ok(run)
    }

    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }
}
