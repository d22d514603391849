//! Catalog navigation collaborators
//!
//! The crawl never talks to a catalog website directly. It drives a
//! [`CatalogNavigator`], a single stateful session positioned on one listing
//! page at a time, which yields the page's rows, reports whether a further
//! page exists, moves forward and turns a row's detail handle into artifact
//! links. Everything site specific (selectors, JSON field names, page URL
//! shapes) lives behind this trait and comes from configuration.
//!
//! Two engines ship with the crate:
//! - [`HtmlNavigator`]: server-rendered listings read with CSS selectors
//! - [`JsonNavigator`]: listing endpoints returning JSON, read with JSON pointers

mod detail;
mod html;
mod json;

pub use detail::DetailResolver;
pub use html::HtmlNavigator;
pub use json::JsonNavigator;

use crate::config::{FetchConfig, NavigationEngine, NavigatorConfig};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Opaque handle to a row's detail page
///
/// For both shipped engines this is an absolute URL, but the orchestrator
/// only ever hands it back to the navigator that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailRef(String);

impl DetailRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DetailRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub display_name: String,
    pub detail: DetailRef,
}

impl CatalogRow {
    pub fn new(display_name: impl Into<String>, detail: DetailRef) -> Self {
        Self {
            display_name: display_name.into(),
            detail,
        }
    }
}

/// A single listing row that could not be read
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {index} unreadable: {reason}")]
pub struct RowExtractionError {
    /// Zero-based position of the row on its page
    pub index: usize,
    pub reason: String,
}

impl RowExtractionError {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// A row slot on a page: either a usable row or the reason it was unusable
pub type RowSlot = Result<CatalogRow, RowExtractionError>;

/// Navigation failures
///
/// Any of these reaching the orchestrator from `open`, `list_rows` or a page
/// advance aborts the run.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("HTTP error while navigating: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Listing not found at {url}: {reason}")]
    ListingMissing { url: String, reason: String },

    #[error("Invalid navigation URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Malformed listing response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("No page follows page {0}")]
    NoFurtherPage(u32),

    #[error("This catalog does not support direct page jumps")]
    JumpUnsupported,

    #[error("Navigator used before open()")]
    NotOpened,
}

/// Result type for navigation operations
pub type NavResult<T> = Result<T, NavigationError>;

/// A stateful session over one paginated catalog
#[async_trait]
pub trait CatalogNavigator: Send {
    /// Loads the first listing page
    async fn open(&mut self) -> NavResult<()>;

    /// One-based number of the page the session is positioned on
    fn current_page(&self) -> u32;

    /// Rows of the current page, in listing order
    async fn list_rows(&mut self) -> NavResult<Vec<RowSlot>>;

    /// Whether a page follows the current one
    async fn has_next_page(&mut self) -> NavResult<bool>;

    /// Whether `jump_to_page` is available
    fn supports_direct_jump(&self) -> bool;

    /// Positions the session directly on `page`
    async fn jump_to_page(&mut self, page: u32) -> NavResult<()>;

    /// Moves to the page after the current one
    async fn next_page(&mut self) -> NavResult<()>;

    /// Artifact links for a row, in preference order
    async fn resolve_artifact_urls(&mut self, detail: &DetailRef) -> NavResult<Vec<String>>;

    /// Approximate number of rows in the whole catalog, when the listing says
    fn total_hint(&self) -> Option<u64>;

    /// Raw content of the current page, for diagnostics
    fn snapshot(&self) -> Option<String>;
}

/// Builds the navigator selected by `config.engine`
pub fn build_navigator(
    config: &NavigatorConfig,
    fetch: &FetchConfig,
) -> NavResult<Box<dyn CatalogNavigator>> {
    let client = crate::crawler::build_http_client(
        &fetch.user_agent,
        Duration::from_secs(config.timeout_secs),
        Duration::from_secs(fetch.connect_timeout_secs),
    )?;
    let resolver = DetailResolver::new(
        client.clone(),
        &config.artifact_selector,
        &fetch.artifact_extension,
    )?;

    let navigator: Box<dyn CatalogNavigator> = match config.engine {
        NavigationEngine::Html => Box::new(HtmlNavigator::new(client, config, resolver)?),
        NavigationEngine::Json => Box::new(JsonNavigator::new(client, config, resolver)?),
    };
    Ok(navigator)
}

/// Fills a `{page}` URL template
pub(crate) fn page_url(template: &str, page: u32) -> NavResult<url::Url> {
    let filled = template.replace("{page}", &page.to_string());
    url::Url::parse(&filled).map_err(|e| NavigationError::InvalidUrl(format!("{}: {}", filled, e)))
}

/// GETs a navigation URL and returns its body, treating non-2xx as failure
pub(crate) async fn fetch_text(client: &Client, url: &url::Url) -> NavResult<String> {
    tracing::debug!("Navigating to {}", url);
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(NavigationError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

/// Pauses after a navigation request when a politeness delay is configured
pub(crate) async fn politeness_pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
