//! Catalog-Harvester: an incremental crawl-and-ingest engine
//!
//! This crate sweeps a large, paginated public catalog, skips entries that are
//! already ingested or appear on an exclusion list, fetches the binary artifact
//! behind each new entry, uploads it to durable storage and records enough
//! state to resume after an interruption without re-downloading anything.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod navigation;
pub mod output;
pub mod sink;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Navigation failure: {0}")]
    Navigation(#[from] navigation::NavigationError),

    #[error("Crawl stalled: {empty_pages} consecutive pages yielded no visitable rows")]
    Stalled { empty_pages: u32 },

    #[error("State persistence error: {0}")]
    Persist(#[from] state::PersistError),

    #[error("Run ledger error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Storage sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true for the fatal stop raised when the crawl runs past valid data
    pub fn is_stall(&self) -> bool {
        matches!(self, Self::Stalled { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector in config: {0}")]
    InvalidSelector(String),

    #[error("Unreadable exclusion source {path}: {message}")]
    ExclusionSource { path: String, message: String },
}

/// Result type alias for Catalog-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{derive_identifier, normalize_name, ExclusionRegistry};
pub use config::Config;
pub use crawler::{run_recorded, Coordinator, PipelineReport, SessionStats};
pub use navigation::{CatalogNavigator, CatalogRow, DetailRef};
pub use sink::StorageSink;
