//! Crawler coordinator - the page-by-page ingestion sweep
//!
//! This module contains the main crawl loop, which:
//! - Walks the catalog one listing page at a time through a navigator
//! - Decides for every row whether it is already ingested, excluded,
//!   previously failed or new
//! - Fetches, uploads and records new rows
//! - Abandons a page after a long run of known rows (skip-ahead)
//! - Stops when the catalog is exhausted, or fatally when too many pages in
//!   a row yield nothing

use crate::catalog::{derive_identifier, ExclusionRegistry};
use crate::config::Config;
use crate::crawler::fetcher::ArtifactFetcher;
use crate::crawler::reconcile::{reconcile_history, ReconcileReport};
use crate::navigation::{build_navigator, CatalogNavigator, CatalogRow, DetailRef, NavResult};
use crate::sink::{build_sink, StorageSink};
use crate::state::{
    FailureLedger, HistoryStore, PersistResult, ProgressSnapshot, RowOutcome, RunPhase,
    SkipReason, StateStores,
};
use crate::{HarvestError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tuning knobs for one crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Consecutive skips on a page before the rest of the page is abandoned
    pub skip_ahead_threshold: u32,
    /// Consecutive pages without visitable rows before the crawl stalls
    pub max_empty_pages: u32,
    pub retry_failed: bool,
    pub reconcile_on_start: bool,
    pub detail_attempts: u32,
    pub detail_retry_delay: Duration,
    /// Pause after a row that did network work
    pub row_delay: Duration,
    pub artifact_extension: String,
    pub diagnostics_dir: PathBuf,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            skip_ahead_threshold: config.run.skip_ahead_threshold,
            max_empty_pages: config.run.max_empty_pages,
            retry_failed: config.run.retry_failed,
            reconcile_on_start: config.run.reconcile_on_start,
            detail_attempts: config.fetch.detail_attempts,
            detail_retry_delay: Duration::from_millis(config.fetch.detail_retry_delay_ms),
            row_delay: Duration::from_millis(config.run.row_delay_ms),
            artifact_extension: config.fetch.artifact_extension.clone(),
            diagnostics_dir: PathBuf::from(&config.paths.diagnostics_dir),
        }
    }
}

/// Counters for one ingestion session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub pages_scanned: u32,
    pub rows_seen: u64,
    pub malformed_rows: u64,
    pub skipped_already: u64,
    pub skipped_excluded: u64,
    pub skipped_failed: u64,
    pub new_downloads: u64,
    /// Rows that failed before reaching storage
    pub failed: u64,
    pub upload_failures: u64,
    pub skip_aheads: u32,
    /// History entries purged by reconciliation
    pub purged: u64,
}

impl SessionStats {
    pub fn skipped(&self) -> u64 {
        self.skipped_already + self.skipped_excluded + self.skipped_failed
    }

    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::AlreadyIngested => self.skipped_already += 1,
            SkipReason::Excluded => self.skipped_excluded += 1,
            SkipReason::PreviouslyFailed => self.skipped_failed += 1,
        }
    }
}

/// What to do with a catalog row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDecision {
    Skip(SkipReason),
    Fetch,
}

/// Decides a row's fate
///
/// The checks run in a fixed order: history first, then the exclusion
/// registry, then (unless `retry_failed`) the failure ledger.
pub fn decide_row(
    identifier: &str,
    display_name: &str,
    history: &HistoryStore,
    registry: &ExclusionRegistry,
    failures: &FailureLedger,
    retry_failed: bool,
) -> RowDecision {
    if history.contains(identifier) {
        RowDecision::Skip(SkipReason::AlreadyIngested)
    } else if registry.is_excluded(display_name) {
        RowDecision::Skip(SkipReason::Excluded)
    } else if !retry_failed && failures.contains(identifier) {
        RowDecision::Skip(SkipReason::PreviouslyFailed)
    } else {
        RowDecision::Fetch
    }
}

/// Moves a navigator to page `next`, preferring a direct jump
pub(crate) async fn advance_page(navigator: &mut dyn CatalogNavigator, next: u32) -> NavResult<()> {
    if navigator.supports_direct_jump() {
        match navigator.jump_to_page(next).await {
            Ok(()) => return Ok(()),
            Err(e) => tracing::warn!(
                "Direct jump to page {} failed ({}); falling back to next page",
                next,
                e
            ),
        }
    }
    navigator.next_page().await
}

/// Main crawl coordinator
pub struct Coordinator {
    settings: CrawlSettings,
    navigator: Box<dyn CatalogNavigator>,
    fetcher: ArtifactFetcher,
    sink: Box<dyn StorageSink>,
    registry: ExclusionRegistry,
    stores: StateStores,
    stats: SessionStats,
    reconcile_report: Option<ReconcileReport>,
}

impl Coordinator {
    pub fn new(
        settings: CrawlSettings,
        navigator: Box<dyn CatalogNavigator>,
        fetcher: ArtifactFetcher,
        sink: Box<dyn StorageSink>,
        registry: ExclusionRegistry,
        stores: StateStores,
    ) -> Self {
        Self {
            settings,
            navigator,
            fetcher,
            sink,
            registry,
            stores,
            stats: SessionStats::default(),
            reconcile_report: None,
        }
    }

    /// Builds every collaborator from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let navigator = build_navigator(&config.catalog, &config.fetch)?;
        let fetcher =
            ArtifactFetcher::from_config(&config.fetch, Path::new(&config.paths.download_dir))?;
        let sink = build_sink(&config.storage)?;
        let registry = ExclusionRegistry::load(Path::new(&config.paths.exclusion_file))?;
        let stores = StateStores::open(&config.paths)?;

        Ok(Self::new(
            CrawlSettings::from_config(config),
            navigator,
            fetcher,
            sink,
            registry,
            stores,
        ))
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn history(&self) -> &HistoryStore {
        &self.stores.history
    }

    pub fn failures(&self) -> &FailureLedger {
        &self.stores.failures
    }

    pub fn progress(&self) -> &ProgressSnapshot {
        self.stores.progress.snapshot()
    }

    /// Report of the reconciliation pass run at start, if any
    pub fn take_reconcile_report(&mut self) -> Option<ReconcileReport> {
        self.reconcile_report.take()
    }

    /// Purges history entries that the exclusion registry now covers
    pub async fn reconcile(&mut self) -> Result<ReconcileReport> {
        let report = reconcile_history(
            &mut self.stores.history,
            &self.registry,
            self.sink.as_ref(),
            &self.settings.artifact_extension,
        )
        .await?;
        self.stats.purged += report.purged.len() as u64;
        Ok(report)
    }

    /// Runs the sweep until the catalog is exhausted
    ///
    /// Returns `HarvestError::Stalled` when `max_empty_pages` consecutive
    /// pages yield no visitable rows, and the navigation error (after saving
    /// a page snapshot) when the listing cannot be reached.
    pub async fn run(&mut self) -> Result<SessionStats> {
        tracing::info!(
            "Starting ingestion: {} already ingested, {} exclusion entries, {} previously failed (retry-failed: {})",
            self.stores.history.len(),
            self.registry.len(),
            self.stores.failures.distinct_count(),
            self.settings.retry_failed
        );

        if self.settings.reconcile_on_start {
            let report = self.reconcile().await?;
            self.reconcile_report = Some(report);
        }

        if let Err(e) = self.navigator.open().await {
            return Err(self.abort(1, e.into()).await);
        }

        let mut page = self.navigator.current_page().max(1);
        let total = self.navigator.total_hint().unwrap_or(0);
        if total > 0 {
            tracing::info!("Catalog reports about {} entries", total);
        }
        self.update_progress(|snapshot| {
            snapshot.total_approx = total;
            snapshot.current_page = page;
            snapshot.current_row = 0;
            snapshot.status = RunPhase::Running;
        })?;

        let mut empty_pages = 0u32;
        loop {
            let visitable = match self.scan_page(page).await {
                Ok(visitable) => visitable,
                Err(e) => return Err(self.abort(page, e).await),
            };

            if visitable == 0 {
                empty_pages += 1;
                tracing::warn!(
                    "Page {} yielded no visitable rows ({}/{} consecutive)",
                    page,
                    empty_pages,
                    self.settings.max_empty_pages
                );
                if empty_pages >= self.settings.max_empty_pages {
                    tracing::error!(
                        "Stopping: {} consecutive empty pages, the crawl has run past the catalog",
                        empty_pages
                    );
                    self.set_phase(RunPhase::Stalled)?;
                    return Err(HarvestError::Stalled { empty_pages });
                }
            } else {
                empty_pages = 0;
            }

            let has_next = match self.navigator.has_next_page().await {
                Ok(has_next) => has_next,
                Err(e) => return Err(self.abort(page, e.into()).await),
            };
            if !has_next {
                tracing::info!("No page after page {}; catalog exhausted", page);
                break;
            }

            if let Err(e) = advance_page(self.navigator.as_mut(), page + 1).await {
                return Err(self.abort(page + 1, e.into()).await);
            }
            page += 1;
        }

        self.set_phase(RunPhase::Completed)?;
        tracing::info!(
            "Ingestion complete: {} new, {} skipped, {} failed, {} upload failures over {} pages",
            self.stats.new_downloads,
            self.stats.skipped(),
            self.stats.failed,
            self.stats.upload_failures,
            self.stats.pages_scanned
        );
        Ok(self.stats)
    }

    /// Scans the current page and returns the number of visitable rows
    async fn scan_page(&mut self, page: u32) -> Result<usize> {
        let rows = self.navigator.list_rows().await?;
        tracing::info!("Page {}: {} rows", page, rows.len());

        let mut visitable = 0usize;
        let mut consecutive_skips = 0u32;

        for (index, slot) in rows.into_iter().enumerate() {
            let row = match slot {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!("Page {}: {}", page, e);
                    self.stats.malformed_rows += 1;
                    continue;
                }
            };
            visitable += 1;
            self.stats.rows_seen += 1;

            let identifier = derive_identifier(&row.display_name, &self.settings.artifact_extension);
            let decision = decide_row(
                &identifier,
                &row.display_name,
                &self.stores.history,
                &self.registry,
                &self.stores.failures,
                self.settings.retry_failed,
            );

            let outcome = match decision {
                RowDecision::Skip(reason) => {
                    consecutive_skips += 1;
                    self.stats.record_skip(reason);
                    tracing::debug!("Skipping '{}': {}", row.display_name, reason);
                    RowOutcome::Skipped(reason)
                }
                RowDecision::Fetch => {
                    consecutive_skips = 0;
                    let outcome = self.ingest_row(&row, &identifier).await?;
                    if outcome.is_error() {
                        tracing::warn!("'{}': {}", row.display_name, outcome);
                    } else if outcome.is_success() {
                        tracing::info!("'{}': {}", row.display_name, outcome);
                    }
                    outcome
                }
            };

            self.record_position(page, index as u32)?;

            if !outcome.is_skip() && !self.settings.row_delay.is_zero() {
                tokio::time::sleep(self.settings.row_delay).await;
            }

            if consecutive_skips >= self.settings.skip_ahead_threshold {
                tracing::info!(
                    "Skip-ahead: {} consecutive known rows on page {}, leaving the rest of the page",
                    consecutive_skips,
                    page
                );
                self.stats.skip_aheads += 1;
                break;
            }
        }

        self.stats.pages_scanned += 1;
        Ok(visitable)
    }

    /// Fetch, upload and record one row
    ///
    /// Row-level failures are recorded in the failure ledger and returned as
    /// outcomes. Only state persistence errors propagate.
    async fn ingest_row(&mut self, row: &CatalogRow, identifier: &str) -> Result<RowOutcome> {
        let artifact = match self.fetcher.existing_local(identifier).await {
            Some(local) => local,
            None => {
                let urls = match self.resolve_candidates(&row.detail).await {
                    Ok(urls) => urls,
                    Err(e) => {
                        return self.record_failure(identifier, format!("detail-unavailable: {}", e))
                    }
                };
                match self.fetcher.fetch_any(&urls, identifier).await {
                    Ok(artifact) => artifact,
                    Err(e) => return self.record_failure(identifier, e.ledger_reason()),
                }
            }
        };
        if artifact.reused_local() {
            tracing::info!("Reusing local copy of {} from an earlier run", identifier);
        } else {
            tracing::debug!("Fetched {} ({} bytes)", identifier, artifact.bytes);
        }

        match self.sink.upload(&artifact.path, identifier).await {
            Ok(()) => {
                if let Err(e) = tokio::fs::remove_file(&artifact.path).await {
                    tracing::warn!(
                        "Uploaded {} but could not remove local copy {}: {}",
                        identifier,
                        artifact.path.display(),
                        e
                    );
                }
                self.stores.history.record(identifier)?;
                self.stats.new_downloads += 1;
                Ok(RowOutcome::Ingested)
            }
            Err(e) => {
                let reason = format!("upload: {}", e);
                tracing::error!(
                    "Upload of {} failed, keeping local copy {}: {}",
                    identifier,
                    artifact.path.display(),
                    e
                );
                self.stores.failures.record(identifier, &reason)?;
                self.stats.upload_failures += 1;
                Ok(RowOutcome::UploadFailed { reason })
            }
        }
    }

    fn record_failure(&mut self, identifier: &str, reason: String) -> Result<RowOutcome> {
        tracing::error!("Failed to ingest {}: {}", identifier, reason);
        self.stores.failures.record(identifier, &reason)?;
        self.stats.failed += 1;
        Ok(RowOutcome::Failed { reason })
    }

    async fn resolve_candidates(&mut self, detail: &DetailRef) -> NavResult<Vec<String>> {
        let attempts = self.settings.detail_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.navigator.resolve_artifact_urls(detail).await {
                Ok(urls) => return Ok(urls),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Detail page {} unavailable (attempt {}/{}): {}",
                        detail,
                        attempt,
                        attempts,
                        e
                    );
                    tokio::time::sleep(self.settings.detail_retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Saves diagnostics, marks the snapshot aborted and hands the error back
    async fn abort(&mut self, page: u32, error: HarvestError) -> HarvestError {
        tracing::error!("Aborting crawl on page {}: {}", page, error);
        self.capture_diagnostics(page).await;
        if let Err(e) = self.set_phase(RunPhase::Aborted) {
            tracing::warn!("Could not record aborted status: {}", e);
        }
        error
    }

    /// Writes the navigator's current page to the diagnostics directory
    async fn capture_diagnostics(&self, page: u32) -> Option<PathBuf> {
        let snapshot = self.navigator.snapshot()?;
        let dir = &self.settings.diagnostics_dir;
        let path = dir.join(format!("error_page_{}.html", page));

        let written = match tokio::fs::create_dir_all(dir).await {
            Ok(()) => tokio::fs::write(&path, snapshot).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                tracing::error!("Saved page snapshot to {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Could not save page snapshot to {}: {}", path.display(), e);
                None
            }
        }
    }

    fn record_position(&mut self, page: u32, row: u32) -> PersistResult<()> {
        self.update_progress(|snapshot| {
            snapshot.current_page = page;
            snapshot.current_row = row;
        })
    }

    fn set_phase(&mut self, phase: RunPhase) -> PersistResult<()> {
        self.update_progress(|snapshot| snapshot.status = phase)
    }

    /// Applies `mutate` on top of the current counters and rewrites the snapshot
    fn update_progress<F>(&mut self, mutate: F) -> PersistResult<()>
    where
        F: FnOnce(&mut ProgressSnapshot),
    {
        let stats = self.stats;
        let processed = self.stores.history.len() as u64;
        self.stores.progress.update(|snapshot| {
            snapshot.processed_count = processed;
            snapshot.skipped_excluded = stats.skipped_excluded;
            snapshot.skipped_already = stats.skipped_already;
            snapshot.skipped_failed = stats.skipped_failed;
            snapshot.failed_count = stats.failed + stats.upload_failures;
            snapshot.new_downloads = stats.new_downloads;
            mutate(snapshot);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        history: HistoryStore,
        failures: FailureLedger,
        registry: ExclusionRegistry,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let mut history = HistoryStore::open(&dir.path().join("history.txt")).unwrap();
        history.record("Old Act.pdf").unwrap();
        let mut failures = FailureLedger::open(&dir.path().join("failed.txt")).unwrap();
        failures.record("Broken Act.pdf", "not-found: gone").unwrap();
        failures.record("Old Act.pdf", "transient: earlier run").unwrap();
        let registry = ExclusionRegistry::from_names(["Repealed Act, 1920, as amended", "Old Act"]);

        Fixture {
            _dir: dir,
            history,
            failures,
            registry,
        }
    }

    fn decide(f: &Fixture, name: &str, retry_failed: bool) -> RowDecision {
        let identifier = derive_identifier(name, "pdf");
        decide_row(&identifier, name, &f.history, &f.registry, &f.failures, retry_failed)
    }

    #[test]
    fn test_history_is_checked_first() {
        let f = fixture();
        // Also excluded and previously failed, but history wins
        assert_eq!(
            decide(&f, "Old Act", false),
            RowDecision::Skip(SkipReason::AlreadyIngested)
        );
    }

    #[test]
    fn test_excluded_row() {
        let f = fixture();
        assert_eq!(
            decide(&f, "Repealed  Act, 1920", false),
            RowDecision::Skip(SkipReason::Excluded)
        );
    }

    #[test]
    fn test_previously_failed_policy() {
        let f = fixture();
        assert_eq!(
            decide(&f, "Broken Act", false),
            RowDecision::Skip(SkipReason::PreviouslyFailed)
        );
        assert_eq!(decide(&f, "Broken Act", true), RowDecision::Fetch);
    }

    #[test]
    fn test_new_row_is_fetched() {
        let f = fixture();
        assert_eq!(decide(&f, "New Act 2024", false), RowDecision::Fetch);
    }

    #[test]
    fn test_session_stats_skips() {
        let mut stats = SessionStats::default();
        stats.record_skip(SkipReason::AlreadyIngested);
        stats.record_skip(SkipReason::Excluded);
        stats.record_skip(SkipReason::Excluded);
        stats.record_skip(SkipReason::PreviouslyFailed);
        assert_eq!(stats.skipped_already, 1);
        assert_eq!(stats.skipped_excluded, 2);
        assert_eq!(stats.skipped(), 4);
    }
}
