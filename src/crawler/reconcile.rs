//! Reconciliation of the ingestion history against the exclusion registry
//!
//! Entries ingested before their catalog name appeared on the exclusion list
//! are deleted from remote storage and dropped from the history. An entry
//! whose deletion fails stays in the history and is retried next time.

use crate::catalog::{recover_display_name, ExclusionRegistry};
use crate::sink::StorageSink;
use crate::state::{HistoryStore, PersistResult};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// History entries examined
    pub examined: usize,
    /// Identifiers deleted from storage and removed from the history
    pub purged: Vec<String>,
    /// Identifiers whose deletion failed, with the reason
    pub failed: Vec<(String, String)>,
}

/// Purges history entries whose recovered display name is now excluded
pub async fn reconcile_history(
    history: &mut HistoryStore,
    registry: &ExclusionRegistry,
    sink: &dyn StorageSink,
    extension: &str,
) -> PersistResult<ReconcileReport> {
    let mut report = ReconcileReport {
        examined: history.len(),
        ..Default::default()
    };

    if registry.is_empty() || history.is_empty() {
        tracing::debug!("Nothing to reconcile");
        return Ok(report);
    }

    let mut candidates: Vec<String> = history
        .iter()
        .filter(|id| registry.is_excluded(&recover_display_name(id, extension)))
        .map(str::to_string)
        .collect();
    candidates.sort();

    tracing::info!(
        "Reconciling: {} of {} ingested entries are now excluded",
        candidates.len(),
        report.examined
    );

    for identifier in candidates {
        match sink.delete(&identifier).await {
            Ok(()) => {
                tracing::info!("Purged {} from {}", identifier, sink.describe());
                report.purged.push(identifier);
            }
            Err(e) => {
                tracing::warn!("Could not purge {}: {}", identifier, e);
                report.failed.push((identifier, e.to_string()));
            }
        }
    }

    let removed = history.remove_all(&report.purged)?;
    tracing::info!(
        "Reconciliation removed {} history entries ({} deletions failed)",
        removed,
        report.failed.len()
    );
    Ok(report)
}
