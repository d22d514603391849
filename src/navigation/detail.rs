//! Detail page resolution shared by the navigation engines
//!
//! A row's detail page may carry several artifact links (for example one per
//! language or per consolidated version). They are returned in document
//! order, deduplicated, and the fetcher tries them in that order.

use crate::navigation::{fetch_text, DetailRef, NavResult, NavigationError};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Turns detail handles into candidate artifact URLs
#[derive(Debug, Clone)]
pub struct DetailResolver {
    client: Client,
    selector: Selector,
    extension: String,
}

impl DetailResolver {
    pub fn new(client: Client, artifact_selector: &str, extension: &str) -> NavResult<Self> {
        let selector = Selector::parse(artifact_selector).map_err(|e| {
            NavigationError::InvalidSelector(format!("'{}': {:?}", artifact_selector, e))
        })?;

        Ok(Self {
            client,
            selector,
            extension: extension.trim_start_matches('.').to_ascii_lowercase(),
        })
    }

    /// Resolves a detail handle into artifact links
    ///
    /// A handle that already points at an artifact (its path ends with the
    /// artifact extension) is returned as the only candidate without a
    /// request.
    pub async fn resolve(&self, detail: &DetailRef) -> NavResult<Vec<String>> {
        let url = Url::parse(detail.as_str())
            .map_err(|e| NavigationError::InvalidUrl(format!("{}: {}", detail, e)))?;

        if self.points_at_artifact(&url) {
            return Ok(vec![url.to_string()]);
        }

        let body = fetch_text(&self.client, &url).await?;
        Ok(extract_artifact_links(&body, &url, &self.selector))
    }

    fn points_at_artifact(&self, url: &Url) -> bool {
        !self.extension.is_empty()
            && url
                .path()
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", self.extension))
    }
}

/// Extracts artifact links from a detail page, in document order
pub(crate) fn extract_artifact_links(body: &str, base_url: &Url, selector: &Selector) -> Vec<String> {
    let document = Html::parse_document(body);
    let mut seen = HashSet::new();

    document
        .select(selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Resolves an href to an absolute HTTP(S) URL
///
/// Returns None for empty and fragment-only hrefs, `javascript:`, `mailto:`,
/// `tel:` and `data:` links, and anything that does not resolve to http or
/// https.
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
