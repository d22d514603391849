//! Storage sink trait and error types

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by a storage sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote storage rejected '{key}' with HTTP {status}")]
    Status { key: String, status: u16 },

    #[error("S3 request for '{key}' failed: {message}")]
    S3 { key: String, message: String },

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Environment variable {0} holding storage credentials is not set")]
    MissingToken(String),

    #[error("Storage sink misconfigured: {0}")]
    Config(String),
}

impl SinkError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Durable remote storage for validated artifacts
///
/// Keys are artifact identifiers, used verbatim. An `Ok` from `upload` is the
/// confirmation the orchestrator waits for before recording an identifier in
/// the history.
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Stores the file at `local` under `key`, replacing any existing object
    async fn upload(&self, local: &Path, key: &str) -> SinkResult<()>;

    /// Removes the object stored under `key`; an absent object is not an error
    async fn delete(&self, key: &str) -> SinkResult<()>;

    /// Human-readable destination, for logs
    fn describe(&self) -> String;
}

/// Rejects keys that could escape a flat namespace
pub(crate) fn check_key(key: &str) -> SinkResult<()> {
    if key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\'])
        || key.chars().any(char::is_control)
    {
        return Err(SinkError::InvalidKey(key.to_string()));
    }
    Ok(())
}
