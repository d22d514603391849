use serde::Deserialize;
use std::fmt;

/// Main configuration structure for Catalog-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub storage: SinkConfig,
    pub catalog: NavigatorConfig,
    #[serde(rename = "exclusion-catalog", default)]
    pub exclusion_catalog: Option<NavigatorConfig>,
}

/// Which parts of the pipeline a run executes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Refresh the exclusion source, then ingest
    Full,
    /// Ingest only, using the exclusion source on disk
    #[default]
    Ingest,
    /// Only refresh the exclusion source
    ExclusionRefresh,
    /// Only purge already-ingested entries that are now excluded
    Reconcile,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Ingest => "ingest",
            Self::ExclusionRefresh => "exclusion-refresh",
            Self::Reconcile => "reconcile",
        }
    }

    /// Returns true if this mode scans the main catalog
    pub fn ingests(&self) -> bool {
        matches!(self, Self::Full | Self::Ingest)
    }

    /// Returns true if this mode refreshes the exclusion source
    pub fn refreshes_exclusions(&self) -> bool {
        matches!(self, Self::Full | Self::ExclusionRefresh)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RunConfig {
    pub mode: RunMode,

    /// Retry rows listed in the failure ledger instead of skipping them
    pub retry_failed: bool,

    /// Consecutive skips on one page before the rest of the page is abandoned
    pub skip_ahead_threshold: u32,

    /// Consecutive pages without visitable rows before the crawl stops
    pub max_empty_pages: u32,

    /// Purge now-excluded entries from storage before ingesting
    pub reconcile_on_start: bool,

    /// Delay between rows that touched the network (milliseconds)
    pub row_delay_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            retry_failed: false,
            skip_ahead_threshold: 20,
            max_empty_pages: 10,
            reconcile_on_start: true,
            row_delay_ms: 300,
        }
    }
}

/// Locations of durable state
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PathsConfig {
    pub history_file: String,
    pub failure_file: String,
    pub progress_file: String,
    pub exclusion_file: String,
    pub download_dir: String,
    pub diagnostics_dir: String,
    pub run_database: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            history_file: "download_history.txt".to_string(),
            failure_file: "failed_downloads.txt".to_string(),
            progress_file: "progress.json".to_string(),
            exclusion_file: "excluded_names.json".to_string(),
            download_dir: "downloads".to_string(),
            diagnostics_dir: "diagnostics".to_string(),
            run_database: "harvest_runs.db".to_string(),
        }
    }
}

/// Artifact fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetchConfig {
    /// Attempts per candidate URL
    pub max_attempts: u32,

    /// Fixed delay between attempts (milliseconds)
    pub retry_delay_ms: u64,

    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,

    /// Payloads must be strictly longer than this many bytes
    pub min_bytes: usize,

    /// Expected leading bytes of a valid artifact
    pub magic: String,

    /// The magic may appear anywhere within this many leading bytes
    pub magic_window: usize,

    /// Extension appended to identifiers
    pub artifact_extension: String,

    /// Attempts to resolve a row's detail page into artifact links
    pub detail_attempts: u32,
    pub detail_retry_delay_ms: u64,

    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 2000,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            min_bytes: 100,
            magic: "%PDF".to_string(),
            magic_window: 1024,
            artifact_extension: "pdf".to_string(),
            detail_attempts: 2,
            detail_retry_delay_ms: 3000,
            user_agent: format!("catalog-harvester/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Where uploaded artifacts go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SinkTarget {
    /// A local or mounted archive directory
    Directory,
    /// An HTTP object endpoint accepting PUT and DELETE
    Http,
    /// An S3 bucket, credentials from the `AWS_*` environment
    S3,
}

/// Remote storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SinkConfig {
    pub target: SinkTarget,

    /// Archive directory for the `directory` target
    #[serde(default)]
    pub directory: Option<String>,

    /// Base URL for the `http` target; objects live at `{base-url}/{identifier}`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding a bearer token for the `http` target
    #[serde(default)]
    pub token_env: Option<String>,

    /// Bucket for the `s3` target
    #[serde(default)]
    pub bucket: Option<String>,

    /// Region for the `s3` target; falls back to `AWS_REGION`
    #[serde(default)]
    pub region: Option<String>,

    /// Endpoint of an S3-compatible store (path-style addressing)
    #[serde(default)]
    pub endpoint_url: Option<String>,

    #[serde(default = "default_sink_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_sink_timeout_secs() -> u64 {
    120
}

/// Which navigation engine drives a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NavigationEngine {
    /// Server-rendered HTML listing read with CSS selectors
    Html,
    /// JSON listing endpoint read with JSON pointers
    Json,
}

/// Navigation configuration for one catalog
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NavigatorConfig {
    pub engine: NavigationEngine,

    /// URL of the first listing page
    pub start_url: String,

    /// Listing URL with a `{page}` placeholder; enables direct page jumps
    #[serde(default)]
    pub page_url_template: Option<String>,

    #[serde(default = "default_navigation_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay after every navigation request (milliseconds)
    #[serde(default)]
    pub politeness_delay_ms: u64,

    // ===== HTML engine =====
    /// Selector for the listing container; a page without it is a navigation failure
    #[serde(default)]
    pub listing_selector: Option<String>,

    /// Selector for listing rows
    #[serde(default)]
    pub row_selector: Option<String>,

    /// Selector, inside a row, for the link carrying name and detail URL
    #[serde(default = "default_link_selector")]
    pub link_selector: String,

    /// Selector for the "next page" control
    #[serde(default)]
    pub next_selector: Option<String>,

    /// Class marking the "next page" control as disabled
    #[serde(default = "default_disabled_class")]
    pub next_disabled_class: String,

    /// Selector for text such as "Showing 1 to 10 of 1,234 entries"
    #[serde(default)]
    pub total_selector: Option<String>,

    // ===== JSON engine =====
    /// JSON pointer to the row array
    #[serde(default = "default_rows_pointer")]
    pub rows_pointer: String,

    #[serde(default = "default_name_field")]
    pub name_field: String,

    #[serde(default = "default_detail_field")]
    pub detail_field: String,

    /// JSON pointer to the total row count
    #[serde(default)]
    pub total_pointer: Option<String>,

    // ===== Detail pages =====
    /// Selector for artifact links on a detail page
    #[serde(default = "default_artifact_selector")]
    pub artifact_selector: String,
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_link_selector() -> String {
    "a[href]".to_string()
}

fn default_disabled_class() -> String {
    "disabled".to_string()
}

fn default_rows_pointer() -> String {
    "/data".to_string()
}

fn default_name_field() -> String {
    "name".to_string()
}

fn default_detail_field() -> String {
    "url".to_string()
}

fn default_artifact_selector() -> String {
    "a[href*='.pdf']".to_string()
}
