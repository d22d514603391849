//! Crawler module for catalog ingestion
//!
//! This module contains the core harvesting logic, including:
//! - Artifact fetching with retry and payload validation
//! - The page-by-page ingestion sweep
//! - Exclusion source refresh
//! - Reconciliation of the history against the exclusion registry
//! - The run pipeline that ties a mode to the run ledger

mod coordinator;
mod fetcher;
mod reconcile;
mod refresh;

pub use coordinator::{decide_row, Coordinator, CrawlSettings, RowDecision, SessionStats};
pub use fetcher::{build_http_client, ArtifactFetcher, FetchError, FetchedArtifact, PayloadValidator};
pub use reconcile::{reconcile_history, ReconcileReport};
pub use refresh::{refresh_exclusions, RefreshReport};

use crate::catalog::ExclusionRegistry;
use crate::config::{Config, RunMode};
use crate::navigation::build_navigator;
use crate::sink::build_sink;
use crate::state::HistoryStore;
use crate::storage::{open_storage, RunCounters, RunStatus, Storage};
use crate::{ConfigError, HarvestError, Result};
use std::path::Path;

/// Everything one invocation did
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub refresh: Option<RefreshReport>,
    pub reconcile: Option<ReconcileReport>,
    pub session: Option<SessionStats>,
}

impl PipelineReport {
    /// Counters for the run ledger
    pub fn counters(&self) -> RunCounters {
        let session = self.session.unwrap_or_default();
        let purged = self
            .reconcile
            .as_ref()
            .map_or(session.purged, |r| r.purged.len() as u64);

        RunCounters {
            pages_scanned: session.pages_scanned,
            new_downloads: session.new_downloads,
            skipped_already: session.skipped_already,
            skipped_excluded: session.skipped_excluded,
            skipped_failed: session.skipped_failed,
            failed: session.failed,
            upload_failures: session.upload_failures,
            purged,
        }
    }
}

/// Runs the configured mode and records it in the run ledger
///
/// This is the main entry point for a harvest. It will:
/// 1. Open the run ledger and mark stale runs as interrupted
/// 2. Create a run for this invocation
/// 3. Execute the mode's stages
/// 4. Record the final status and counters
pub async fn run_recorded(config: &Config, config_hash: &str) -> Result<PipelineReport> {
    let mut ledger = open_storage(Path::new(&config.paths.run_database))?;
    let stale = ledger.mark_interrupted_runs()?;
    if stale > 0 {
        tracing::warn!("{} earlier run(s) ended without finishing", stale);
    }

    let mode = config.run.mode;
    let run_id = ledger.create_run(config_hash, mode.as_str())?;
    tracing::info!("Run {} started in {} mode", run_id, mode);

    let mut report = PipelineReport::default();
    let result = run_pipeline(config, &mut report).await;

    let status = match &result {
        Ok(()) => RunStatus::Completed,
        Err(e) if e.is_stall() => RunStatus::Stalled,
        Err(HarvestError::Navigation(_)) => RunStatus::Aborted,
        Err(_) => RunStatus::Failed,
    };
    let message = result.as_ref().err().map(ToString::to_string);

    if let Err(e) = ledger.finish_run(run_id, status, &report.counters(), message.as_deref()) {
        if result.is_ok() {
            return Err(e.into());
        }
        tracing::warn!("Could not record the end of run {}: {}", run_id, e);
    }
    match ledger.get_run(run_id) {
        Ok(record) => tracing::info!(
            "Run {} finished: {} ({} new, {} failed, {} purged)",
            record.id,
            record.status,
            record.counters.new_downloads,
            record.counters.failed + record.counters.upload_failures,
            record.counters.purged
        ),
        Err(e) => tracing::warn!("Run {} finished: {} (ledger unreadable: {})", run_id, status, e),
    }

    result.map(|()| report)
}

/// Executes the stages selected by `config.run.mode`
///
/// Stages fill `report` as they finish, so a failing stage still leaves the
/// counters of the work done before it.
pub async fn run_pipeline(config: &Config, report: &mut PipelineReport) -> Result<()> {
    let mode = config.run.mode;

    if mode.refreshes_exclusions() {
        let catalog = config.exclusion_catalog.as_ref().ok_or_else(|| {
            ConfigError::Validation(format!("mode '{}' requires [exclusion-catalog]", mode))
        })?;
        let mut navigator = build_navigator(catalog, &config.fetch)?;
        let refreshed = refresh_exclusions(
            navigator.as_mut(),
            Path::new(&config.paths.exclusion_file),
            &catalog.start_url,
            config.run.max_empty_pages,
        )
        .await?;
        report.refresh = Some(refreshed);
    }

    match mode {
        RunMode::Reconcile => {
            let registry = ExclusionRegistry::load(Path::new(&config.paths.exclusion_file))?;
            let mut history = HistoryStore::open(Path::new(&config.paths.history_file))?;
            let sink = build_sink(&config.storage)?;
            let reconciled = reconcile_history(
                &mut history,
                &registry,
                sink.as_ref(),
                &config.fetch.artifact_extension,
            )
            .await?;
            report.reconcile = Some(reconciled);
        }
        RunMode::Full | RunMode::Ingest => {
            let mut coordinator = Coordinator::from_config(config)?;
            let result = coordinator.run().await;
            report.session = Some(coordinator.stats());
            report.reconcile = coordinator.take_reconcile_report();
            result?;
        }
        RunMode::ExclusionRefresh => {}
    }

    Ok(())
}
