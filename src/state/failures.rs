//! Failure ledger
//!
//! Append-only log of rows that could not be ingested, one `identifier|reason`
//! line per failure. The same identifier may appear many times across runs.

use crate::state::{open_append, read_lines, PersistError, PersistResult};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable, append-only record of failed rows
#[derive(Debug)]
pub struct FailureLedger {
    path: PathBuf,
    failed: HashSet<String>,
    entry_count: usize,
}

impl FailureLedger {
    /// Opens the ledger and loads the set of previously failed identifiers
    ///
    /// Only the part before the first `|` of each line is kept in memory.
    pub fn open(path: &Path) -> PersistResult<Self> {
        let mut failed = HashSet::new();
        let mut entry_count = 0;

        for line in read_lines(path)? {
            if line.trim().is_empty() {
                continue;
            }
            entry_count += 1;
            let identifier = line.split('|').next().unwrap_or_default().trim();
            if !identifier.is_empty() {
                failed.insert(identifier.to_string());
            }
        }

        tracing::debug!(
            "Loaded {} failure entries ({} distinct) from {}",
            entry_count,
            failed.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            failed,
            entry_count,
        })
    }

    /// Returns true if the identifier has failed before
    pub fn contains(&self, identifier: &str) -> bool {
        self.failed.contains(identifier)
    }

    /// Number of distinct identifiers that have failed
    pub fn distinct_count(&self) -> usize {
        self.failed.len()
    }

    /// Number of lines in the ledger, including repeats
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Appends a failure and syncs the ledger file
    ///
    /// The reason is flattened to a single line without `|` so the ledger
    /// stays parseable.
    pub fn record(&mut self, identifier: &str, reason: &str) -> PersistResult<()> {
        let reason = sanitize_reason(reason);

        let mut file = open_append(&self.path)?;
        writeln!(file, "{}|{}", identifier, reason)
            .map_err(|e| PersistError::io(&self.path, e))?;
        file.sync_data()
            .map_err(|e| PersistError::io(&self.path, e))?;

        self.failed.insert(identifier.to_string());
        self.entry_count += 1;
        Ok(())
    }
}

fn sanitize_reason(reason: &str) -> String {
    reason
        .chars()
        .map(|c| match c {
            '|' | '\n' | '\r' => ' ',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
