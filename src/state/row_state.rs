/// Row outcome definitions for tracking crawl decisions
///
/// This module defines every way a catalog row can leave the row scan.
use std::fmt;

/// Why a row was skipped without fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Identifier is already in the history record
    AlreadyIngested,

    /// Display name matches the exclusion registry
    Excluded,

    /// Identifier failed in an earlier run and retrying is disabled
    PreviouslyFailed,
}

impl SkipReason {
    /// Stable string form used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyIngested => "already-ingested",
            Self::Excluded => "excluded",
            Self::PreviouslyFailed => "previously-failed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final result of processing one catalog row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    // ===== Skip States =====
    /// Row was skipped before any network access
    Skipped(SkipReason),

    // ===== Terminal Success States =====
    /// Artifact was fetched, uploaded and recorded in history
    Ingested,

    // ===== Terminal Error States =====
    /// Artifact could not be fetched or detail links could not be resolved
    Failed { reason: String },

    /// Artifact was fetched but the upload failed; the local copy is kept
    UploadFailed { reason: String },
}

impl RowOutcome {
    /// Returns true if the row was skipped
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Returns true if this represents a successful ingestion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ingested)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::UploadFailed { .. })
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped(reason) => reason.as_str(),
            Self::Ingested => "ingested",
            Self::Failed { .. } => "failed",
            Self::UploadFailed { .. } => "upload-failed",
        }
    }
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } | Self::UploadFailed { reason } => {
                write!(f, "{} ({})", self.label(), reason)
            }
            _ => write!(f, "{}", self.label()),
        }
    }
}
