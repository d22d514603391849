//! Statistics from the run ledger
//!
//! This module reads recent runs back from the ledger and prints them for
//! `--stats`.

use crate::storage::{RunCounters, RunRecord, RunStatus, Storage, StorageResult};
use chrono::{DateTime, Utc};

/// Recent run history with totals
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Most recent runs, newest first
    pub runs: Vec<RunRecord>,

    /// Counters summed over `runs`
    pub totals: RunCounters,

    /// Number of runs in `runs` that completed
    pub completed_runs: usize,
}

/// Loads the `limit` most recent runs from storage
pub fn load_statistics(storage: &dyn Storage, limit: usize) -> StorageResult<HarvestStatistics> {
    let runs = storage.list_runs(limit)?;

    let mut totals = RunCounters::default();
    for run in &runs {
        let c = &run.counters;
        totals.pages_scanned += c.pages_scanned;
        totals.new_downloads += c.new_downloads;
        totals.skipped_already += c.skipped_already;
        totals.skipped_excluded += c.skipped_excluded;
        totals.skipped_failed += c.skipped_failed;
        totals.failed += c.failed;
        totals.upload_failures += c.upload_failures;
        totals.purged += c.purged;
    }
    let completed_runs = runs
        .iter()
        .filter(|run| run.status == RunStatus::Completed)
        .count();

    Ok(HarvestStatistics {
        runs,
        totals,
        completed_runs,
    })
}

/// Wall-clock duration of a finished run in seconds
pub fn run_duration_seconds(run: &RunRecord) -> Option<i64> {
    let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
    let finished = run.finished_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
    Some((finished - started).num_seconds())
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    if stats.runs.is_empty() {
        println!("No runs recorded yet.");
        return;
    }

    println!("Recent Runs:");
    for run in &stats.runs {
        let duration = run_duration_seconds(run)
            .map(|secs| format!("{}s", secs))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{} {} [{}] {} ({}): {} new, {} skipped, {} failed",
            run.id,
            run.started_at,
            run.mode,
            run.status,
            duration,
            run.counters.new_downloads,
            run.counters.skipped_already + run.counters.skipped_excluded + run.counters.skipped_failed,
            run.counters.failed + run.counters.upload_failures
        );
        if let Some(message) = &run.error_message {
            println!("      {}", message);
        }
    }
    println!();

    println!("Totals over {} runs ({} completed):", stats.runs.len(), stats.completed_runs);
    println!("  New downloads: {}", stats.totals.new_downloads);
    println!("  Pages scanned: {}", stats.totals.pages_scanned);
    println!(
        "  Skipped: {} already ingested, {} excluded, {} previously failed",
        stats.totals.skipped_already, stats.totals.skipped_excluded, stats.totals.skipped_failed
    );
    println!(
        "  Failed: {} fetch, {} upload",
        stats.totals.failed, stats.totals.upload_failures
    );
    println!("  Purged by reconciliation: {}", stats.totals.purged);
}
