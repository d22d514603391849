//! Output module for run reports
//!
//! This module handles:
//! - Summarizing what a single invocation did
//! - Reading recent runs back from the run ledger for `--stats`

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::crawler::PipelineReport;

/// Formats the end-of-run summary for one invocation
pub fn format_run_summary(report: &PipelineReport) -> String {
    let mut out = String::new();

    if let Some(refresh) = &report.refresh {
        out.push_str(&format!(
            "Exclusion refresh: {} names from {} pages{}\n",
            refresh.names,
            refresh.pages,
            if refresh.written { "" } else { " (file kept)" }
        ));
    }

    if let Some(reconcile) = &report.reconcile {
        out.push_str(&format!(
            "Reconciliation: {} examined, {} purged, {} deletions failed\n",
            reconcile.examined,
            reconcile.purged.len(),
            reconcile.failed.len()
        ));
    }

    if let Some(session) = &report.session {
        out.push_str(&format!(
            "Ingestion: {} pages, {} rows seen\n",
            session.pages_scanned, session.rows_seen
        ));
        out.push_str(&format!("  New downloads: {}\n", session.new_downloads));
        out.push_str(&format!(
            "  Skipped: {} already ingested, {} excluded, {} previously failed\n",
            session.skipped_already, session.skipped_excluded, session.skipped_failed
        ));
        out.push_str(&format!(
            "  Failed: {} fetch, {} upload\n",
            session.failed, session.upload_failures
        ));
        if session.malformed_rows > 0 {
            out.push_str(&format!("  Malformed rows: {}\n", session.malformed_rows));
        }
        if session.skip_aheads > 0 {
            out.push_str(&format!("  Skip-aheads: {}\n", session.skip_aheads));
        }
    }

    out
}

/// Prints the end-of-run summary to stdout
pub fn print_run_summary(report: &PipelineReport) {
    println!("=== Harvest Summary ===\n");
    print!("{}", format_run_summary(report));
}
