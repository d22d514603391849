//! Exclusion registry
//!
//! Holds the normalized names of catalog entries that must never be ingested
//! and answers membership queries with a boundary-checked prefix match.

use crate::catalog::normalize::normalize_name;
use crate::state::{write_atomic, PersistError};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk form of the exclusion list
///
/// Only `names` is required when loading; the remaining fields are written
/// by the exclusion refresh for the benefit of human readers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExclusionSource {
    #[serde(default)]
    pub total_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<String>,

    pub names: Vec<String>,
}

impl ExclusionSource {
    /// Builds a source document from freshly scraped names
    pub fn new(names: Vec<String>, source: Option<String>) -> Self {
        Self {
            total_count: names.len(),
            source,
            scraped_at: Some(chrono::Utc::now().to_rfc3339()),
            names,
        }
    }
}

/// Loads the exclusion source file
///
/// # Returns
///
/// * `Ok(Some(ExclusionSource))` - The file exists and parsed
/// * `Ok(None)` - The file does not exist
/// * `Err(ConfigError)` - The file exists but could not be read or parsed
pub fn load_exclusion_source(path: &Path) -> Result<Option<ExclusionSource>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::ExclusionSource {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::ExclusionSource {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

/// Atomically rewrites the exclusion source file
pub fn save_exclusion_source(path: &Path, source: &ExclusionSource) -> Result<(), PersistError> {
    let json = serde_json::to_vec_pretty(source)?;
    write_atomic(path, &json)
}

/// Set of excluded catalog names
///
/// Entries are normalized once at construction and kept sorted, so every
/// registry entry that starts with a candidate sits in one contiguous run
/// found by binary search.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRegistry {
    entries: Vec<String>,
}

impl ExclusionRegistry {
    /// Creates an empty registry
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry from raw (un-normalized) names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: Vec<String> = names
            .into_iter()
            .map(|name| normalize_name(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();
        entries.sort();
        entries.dedup();
        Self { entries }
    }

    /// Loads the registry from an exclusion source file
    ///
    /// A missing file is not fatal: the registry is empty and a warning is
    /// logged, because every excluded entry will then be ingested.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match load_exclusion_source(path)? {
            Some(source) => {
                let registry = Self::from_names(&source.names);
                tracing::info!(
                    "Loaded {} exclusion entries from {}",
                    registry.len(),
                    path.display()
                );
                Ok(registry)
            }
            None => {
                tracing::warn!(
                    "Exclusion source {} not found; NO catalog entries will be excluded this run",
                    path.display()
                );
                Ok(Self::empty())
            }
        }
    }

    /// Number of distinct normalized entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the registry holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks whether a catalog name is excluded
    ///
    /// A name is excluded when some registry entry starts with its normalized
    /// form and the entry continues with a qualifier boundary:
    /// end-of-string, `,`, `(`, or a space followed by a non-letter.
    ///
    /// # Examples
    ///
    /// ```
    /// use catalog_harvester::catalog::ExclusionRegistry;
    ///
    /// let registry = ExclusionRegistry::from_names(["Factories Act, 1948"]);
    /// assert!(registry.is_excluded("Factories Act"));
    ///
    /// let registry = ExclusionRegistry::from_names(["Factories Act II"]);
    /// assert!(!registry.is_excluded("Factories Act"));
    /// ```
    pub fn is_excluded(&self, name: &str) -> bool {
        let candidate = normalize_name(name);
        if candidate.is_empty() {
            return false;
        }

        let start = self
            .entries
            .partition_point(|entry| entry.as_str() < candidate.as_str());

        self.entries[start..]
            .iter()
            .take_while(|entry| entry.starts_with(candidate.as_str()))
            .any(|entry| is_qualifier_boundary(&entry[candidate.len()..]))
    }
}

/// Checks the text that follows a matched prefix in a registry entry
fn is_qualifier_boundary(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        None | Some(',') | Some('(') => true,
        // "Act 1948" or "Act (Amendment)" qualify, "Act II" is a different title
        Some(' ') => !chars.next().is_some_and(char::is_alphabetic),
        _ => false,
    }
}
