//! Database schema for the run ledger

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per invocation
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    mode TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_scanned INTEGER NOT NULL DEFAULT 0,
    new_downloads INTEGER NOT NULL DEFAULT 0,
    skipped_already INTEGER NOT NULL DEFAULT 0,
    skipped_excluded INTEGER NOT NULL DEFAULT 0,
    skipped_failed INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    upload_failures INTEGER NOT NULL DEFAULT 0,
    purged INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
