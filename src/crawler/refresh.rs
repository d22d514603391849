//! Exclusion source refresh
//!
//! Walks the exclusion catalog (a second listing of obsolete titles) and
//! rewrites the exclusion source file with every distinct name found.

use crate::catalog::{normalize_name, save_exclusion_source, ExclusionSource};
use crate::crawler::coordinator::advance_page;
use crate::navigation::CatalogNavigator;
use crate::Result;
use std::collections::HashSet;
use std::path::Path;

/// Outcome of one refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub pages: u32,
    /// Distinct names collected
    pub names: usize,
    pub malformed_rows: usize,
    /// False when nothing was collected and the existing file was kept
    pub written: bool,
}

/// Collects every name from `navigator` and saves them to `destination`
///
/// Names are deduplicated by their normalized form; the first spelling seen
/// is kept. A walk that collects nothing leaves the existing file untouched.
pub async fn refresh_exclusions(
    navigator: &mut dyn CatalogNavigator,
    destination: &Path,
    source_label: &str,
    max_empty_pages: u32,
) -> Result<RefreshReport> {
    tracing::info!("Refreshing exclusion source from {}", source_label);
    navigator.open().await?;

    let mut report = RefreshReport::default();
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut empty_pages = 0u32;

    loop {
        let page = navigator.current_page();
        let rows = navigator.list_rows().await?;
        report.pages += 1;

        let mut found = 0usize;
        for slot in rows {
            match slot {
                Ok(row) => {
                    found += 1;
                    let key = normalize_name(&row.display_name);
                    if !key.is_empty() && seen.insert(key) {
                        names.push(row.display_name);
                    }
                }
                Err(e) => {
                    tracing::debug!("Exclusion page {}: {}", page, e);
                    report.malformed_rows += 1;
                }
            }
        }
        tracing::info!(
            "Exclusion page {}: {} names ({} distinct so far)",
            page,
            found,
            names.len()
        );

        if found == 0 {
            empty_pages += 1;
            if empty_pages >= max_empty_pages {
                tracing::warn!(
                    "Stopping exclusion refresh after {} empty pages",
                    empty_pages
                );
                break;
            }
        } else {
            empty_pages = 0;
        }

        if !navigator.has_next_page().await? {
            break;
        }
        advance_page(navigator, page + 1).await?;
    }

    report.names = names.len();
    if names.is_empty() {
        tracing::warn!(
            "Exclusion refresh collected no names; keeping {}",
            destination.display()
        );
        return Ok(report);
    }

    let source = ExclusionSource::new(names, Some(source_label.to_string()));
    save_exclusion_source(destination, &source)?;
    report.written = true;
    tracing::info!(
        "Saved {} exclusion names to {}",
        report.names,
        destination.display()
    );
    Ok(report)
}
