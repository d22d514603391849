//! Ingestion history store
//!
//! The history file is a newline-delimited list of artifact identifiers whose
//! upload has been confirmed. It is rehydrated into memory at startup and
//! every new identifier is appended and synced before `record` returns.

use crate::state::{open_append, read_lines, write_atomic, PersistError, PersistResult};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable, append-only set of ingested identifiers
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    entries: HashSet<String>,
}

impl HistoryStore {
    /// Opens the history file, loading every identifier into memory
    ///
    /// A missing file yields an empty store; it is created on first append.
    pub fn open(path: &Path) -> PersistResult<Self> {
        let entries: HashSet<String> = read_lines(path)?
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        tracing::debug!(
            "Loaded {} ingested identifiers from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the identifier has been ingested
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains(identifier)
    }

    /// Number of ingested identifiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been ingested
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the ingested identifiers in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Records an identifier as ingested
    ///
    /// Appends to the history file and syncs it before updating memory, so a
    /// crash never leaves an identifier in memory that is missing on disk.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The identifier was new and has been appended
    /// * `Ok(false)` - The identifier was already recorded
    pub fn record(&mut self, identifier: &str) -> PersistResult<bool> {
        if self.entries.contains(identifier) {
            return Ok(false);
        }

        let mut file = open_append(&self.path)?;
        writeln!(file, "{}", identifier).map_err(|e| PersistError::io(&self.path, e))?;
        file.sync_data()
            .map_err(|e| PersistError::io(&self.path, e))?;

        self.entries.insert(identifier.to_string());
        Ok(true)
    }

    /// Removes identifiers from the history
    ///
    /// This is the only operation that shrinks the history; it rewrites the
    /// whole file atomically. Identifiers that are not present are ignored.
    ///
    /// # Returns
    ///
    /// The number of identifiers actually removed
    pub fn remove_all<S: AsRef<str>>(&mut self, identifiers: &[S]) -> PersistResult<usize> {
        let removed = identifiers
            .iter()
            .filter(|id| self.entries.contains(id.as_ref()))
            .count();
        if removed == 0 {
            return Ok(0);
        }

        let mut remaining: Vec<&str> = self
            .entries
            .iter()
            .map(String::as_str)
            .filter(|entry| !identifiers.iter().any(|id| id.as_ref() == *entry))
            .collect();
        remaining.sort_unstable();

        let mut content = remaining.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        write_atomic(&self.path, content.as_bytes())?;

        for id in identifiers {
            self.entries.remove(id.as_ref());
        }
        Ok(removed)
    }
}
