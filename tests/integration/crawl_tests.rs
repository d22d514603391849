//! Integration tests for the harvester
//!
//! These tests drive the coordinator over scripted catalogs, serve artifacts
//! from wiremock servers and keep all state in temporary directories.

use async_trait::async_trait;
use catalog_harvester::catalog::{derive_identifier, ExclusionRegistry};
use catalog_harvester::config::{parse_config, PathsConfig};
use catalog_harvester::crawler::{
    run_recorded, ArtifactFetcher, Coordinator, CrawlSettings, PayloadValidator,
};
use catalog_harvester::navigation::{
    CatalogNavigator, CatalogRow, DetailRef, NavResult, NavigationError, RowExtractionError,
    RowSlot,
};
use catalog_harvester::sink::{DirectorySink, SinkError, SinkResult, StorageSink};
use catalog_harvester::state::{HistoryStore, ProgressTracker, RunPhase, StateStores};
use catalog_harvester::storage::{RunStatus, SqliteStorage, Storage};
use catalog_harvester::HarvestError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A row in a scripted catalog
#[derive(Clone)]
enum FakeRow {
    Row { name: String, artifact_url: String },
    Malformed,
}

/// How a scripted catalog moves between pages
#[derive(Clone, Copy, PartialEq, Eq)]
enum JumpMode {
    Direct,
    Unsupported,
    Failing,
}

/// Navigator calls observed by a test after the navigator moved into a coordinator
#[derive(Default)]
struct NavCalls {
    jumps: AtomicU32,
    next_pages: AtomicU32,
    resolves: AtomicU32,
}

impl NavCalls {
    fn jumps(&self) -> u32 {
        self.jumps.load(Ordering::SeqCst)
    }

    fn next_pages(&self) -> u32 {
        self.next_pages.load(Ordering::SeqCst)
    }

    fn resolves(&self) -> u32 {
        self.resolves.load(Ordering::SeqCst)
    }
}

/// A catalog served from memory
///
/// Detail handles are artifact URLs, so resolving a row needs no request.
struct FakeNavigator {
    pages: Vec<Vec<FakeRow>>,
    current: usize,
    fail_on_page: Option<u32>,
    jump_mode: JumpMode,
    detail_failures: u32,
    calls: Arc<NavCalls>,
}

impl FakeNavigator {
    fn new(pages: Vec<Vec<FakeRow>>) -> Self {
        Self {
            pages,
            current: 0,
            fail_on_page: None,
            jump_mode: JumpMode::Direct,
            detail_failures: 0,
            calls: Arc::new(NavCalls::default()),
        }
    }

    fn failing_on(mut self, page: u32) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    fn with_jumps(mut self, mode: JumpMode) -> Self {
        self.jump_mode = mode;
        self
    }

    /// Fails the first `count` detail resolutions
    fn failing_details(mut self, count: u32) -> Self {
        self.detail_failures = count;
        self
    }

    fn calls(&self) -> Arc<NavCalls> {
        Arc::clone(&self.calls)
    }

    fn move_to(&mut self, page: u32) -> NavResult<()> {
        if page == 0 || page as usize > self.pages.len() {
            return Err(NavigationError::NoFurtherPage(self.current_page()));
        }
        self.current = page as usize - 1;
        Ok(())
    }
}

#[async_trait]
impl CatalogNavigator for FakeNavigator {
    async fn open(&mut self) -> NavResult<()> {
        self.current = 0;
        Ok(())
    }

    fn current_page(&self) -> u32 {
        self.current as u32 + 1
    }

    async fn list_rows(&mut self) -> NavResult<Vec<RowSlot>> {
        if self.fail_on_page == Some(self.current_page()) {
            return Err(NavigationError::ListingMissing {
                url: format!("fake://page/{}", self.current_page()),
                reason: "listing table not found".to_string(),
            });
        }

        Ok(self.pages[self.current]
            .iter()
            .enumerate()
            .map(|(index, row)| match row {
                FakeRow::Row { name, artifact_url } => {
                    Ok(CatalogRow::new(name.clone(), DetailRef::new(artifact_url.clone())))
                }
                FakeRow::Malformed => Err(RowExtractionError::new(index, "no title link")),
            })
            .collect())
    }

    async fn has_next_page(&mut self) -> NavResult<bool> {
        Ok(self.current + 1 < self.pages.len())
    }

    fn supports_direct_jump(&self) -> bool {
        self.jump_mode != JumpMode::Unsupported
    }

    async fn jump_to_page(&mut self, page: u32) -> NavResult<()> {
        self.calls.jumps.fetch_add(1, Ordering::SeqCst);
        match self.jump_mode {
            JumpMode::Direct => self.move_to(page),
            JumpMode::Unsupported => Err(NavigationError::JumpUnsupported),
            JumpMode::Failing => Err(NavigationError::Status {
                url: format!("fake://page/{}", page),
                status: 500,
            }),
        }
    }

    async fn next_page(&mut self) -> NavResult<()> {
        self.calls.next_pages.fetch_add(1, Ordering::SeqCst);
        let next = self.current_page() + 1;
        self.move_to(next)
    }

    async fn resolve_artifact_urls(&mut self, detail: &DetailRef) -> NavResult<Vec<String>> {
        self.calls.resolves.fetch_add(1, Ordering::SeqCst);
        if self.detail_failures > 0 {
            self.detail_failures -= 1;
            return Err(NavigationError::Status {
                url: detail.as_str().to_string(),
                status: 503,
            });
        }
        Ok(vec![detail.as_str().to_string()])
    }

    fn total_hint(&self) -> Option<u64> {
        Some(self.pages.iter().map(|page| page.len() as u64).sum())
    }

    fn snapshot(&self) -> Option<String> {
        Some(format!(
            "<html><body>fake listing page {}</body></html>",
            self.current_page()
        ))
    }
}

/// A sink whose uploads always fail
struct RejectingSink;

#[async_trait]
impl StorageSink for RejectingSink {
    async fn upload(&self, _local: &Path, key: &str) -> SinkResult<()> {
        Err(SinkError::Status {
            key: key.to_string(),
            status: 503,
        })
    }

    async fn delete(&self, _key: &str) -> SinkResult<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "rejecting".to_string()
    }
}

fn pdf_body() -> Vec<u8> {
    let mut body = b"%PDF-1.7\n".to_vec();
    body.extend(std::iter::repeat(b'x').take(256));
    body
}

fn id(name: &str) -> String {
    derive_identifier(name, "pdf")
}

/// Temporary state directory plus an artifact server
struct Harness {
    dir: TempDir,
    server: MockServer,
    paths: PathsConfig,
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().display().to_string();
        let paths = PathsConfig {
            history_file: format!("{}/history.txt", root),
            failure_file: format!("{}/failed.txt", root),
            progress_file: format!("{}/progress.json", root),
            exclusion_file: format!("{}/excluded.json", root),
            download_dir: format!("{}/downloads", root),
            diagnostics_dir: format!("{}/diagnostics", root),
            run_database: format!("{}/runs.db", root),
        };

        Self {
            dir,
            server: MockServer::start().await,
            paths,
        }
    }

    fn archive(&self) -> PathBuf {
        self.dir.path().join("archive")
    }

    fn local_copy(&self, name: &str) -> PathBuf {
        Path::new(&self.paths.download_dir).join(id(name))
    }

    fn settings(&self) -> CrawlSettings {
        CrawlSettings {
            skip_ahead_threshold: 20,
            max_empty_pages: 10,
            retry_failed: false,
            reconcile_on_start: false,
            detail_attempts: 2,
            detail_retry_delay: Duration::ZERO,
            row_delay: Duration::ZERO,
            artifact_extension: "pdf".to_string(),
            diagnostics_dir: PathBuf::from(&self.paths.diagnostics_dir),
        }
    }

    fn seed_history(&self, names: &[&str]) {
        let mut history = HistoryStore::open(Path::new(&self.paths.history_file)).unwrap();
        for name in names {
            history.record(&id(name)).unwrap();
        }
    }

    fn history(&self) -> HistoryStore {
        HistoryStore::open(Path::new(&self.paths.history_file)).unwrap()
    }

    fn row(&self, name: &str) -> FakeRow {
        FakeRow::Row {
            name: name.to_string(),
            artifact_url: self.artifact_url(name),
        }
    }

    fn artifact_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.server.uri(), slug(name))
    }

    async fn serve_artifact(&self, name: &str, expected_requests: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/files/{}", slug(name))))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body()))
            .expect(expected_requests)
            .mount(&self.server)
            .await;
    }

    fn coordinator_with(
        &self,
        settings: CrawlSettings,
        navigator: FakeNavigator,
        registry: ExclusionRegistry,
        sink: Box<dyn StorageSink>,
    ) -> Coordinator {
        let fetcher = ArtifactFetcher::new(
            reqwest::Client::new(),
            &self.paths.download_dir,
            3,
            Duration::ZERO,
            PayloadValidator::new(10, b"%PDF", 1024),
        );
        let stores = StateStores::open(&self.paths).unwrap();
        Coordinator::new(settings, Box::new(navigator), fetcher, sink, registry, stores)
    }

    fn coordinator(&self, navigator: FakeNavigator, registry: ExclusionRegistry) -> Coordinator {
        self.coordinator_with(
            self.settings(),
            navigator,
            registry,
            Box::new(DirectorySink::new(self.archive())),
        )
    }
}

fn slug(name: &str) -> String {
    let mut slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    slug.push_str(".pdf");
    slug
}

#[tokio::test]
async fn test_skips_known_and_excluded_rows_and_ingests_new_one() {
    let h = Harness::new().await;
    h.seed_history(&["Old Act"]);
    h.serve_artifact("Old Act", 0).await;
    h.serve_artifact("Repealed Act, 1920", 0).await;
    h.serve_artifact("New Act 2024", 1).await;

    let registry = ExclusionRegistry::from_names(["Repealed Act, 1920, as amended"]);
    let navigator = FakeNavigator::new(vec![vec![
        h.row("Old Act"),
        h.row("Repealed Act, 1920"),
        h.row("New Act 2024"),
    ]]);

    let mut coordinator = h.coordinator(navigator, registry);
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.skipped_already, 1);
    assert_eq!(stats.skipped_excluded, 1);
    assert_eq!(stats.new_downloads, 1);
    assert_eq!(stats.failed, 0);

    // Stored remotely, recorded, local copy gone
    let stored = h.archive().join(id("New Act 2024"));
    assert_eq!(std::fs::read(stored).unwrap(), pdf_body());
    assert!(!h.local_copy("New Act 2024").exists());
    assert!(h.history().contains(&id("New Act 2024")));
    assert_eq!(h.history().len(), 2);

    let snapshot = ProgressTracker::load(Path::new(&h.paths.progress_file))
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.processed_count, 2);
    assert_eq!(snapshot.skipped_excluded, 1);
    assert_eq!(snapshot.new_downloads, 1);
    assert_eq!(snapshot.current_page, 1);
    assert_eq!(snapshot.current_row, 2);
    assert_eq!(snapshot.status, RunPhase::Completed);
}

#[tokio::test]
async fn test_skip_ahead_abandons_page_after_threshold() {
    let h = Harness::new().await;

    let known: Vec<String> = (1..=20).map(|i| format!("Known Act {}", i)).collect();
    let known_refs: Vec<&str> = known.iter().map(String::as_str).collect();
    h.seed_history(&known_refs);

    let mut rows: Vec<FakeRow> = known.iter().map(|name| h.row(name)).collect();
    for i in 21..=25 {
        let name = format!("Unseen Act {}", i);
        h.serve_artifact(&name, 0).await;
        rows.push(h.row(&name));
    }

    let mut coordinator = h.coordinator(FakeNavigator::new(vec![rows]), ExclusionRegistry::empty());
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.rows_seen, 20);
    assert_eq!(stats.skipped_already, 20);
    assert_eq!(stats.skip_aheads, 1);
    assert_eq!(stats.new_downloads, 0);
    assert_eq!(coordinator.progress().current_row, 19);
    assert_eq!(h.history().len(), 20);
}

#[tokio::test]
async fn test_second_run_over_unchanged_catalog_downloads_nothing() {
    let h = Harness::new().await;
    for name in ["First Act", "Second Act", "Third Act"] {
        // One request across both runs
        h.serve_artifact(name, 1).await;
    }
    let pages = vec![
        vec![h.row("First Act"), h.row("Second Act")],
        vec![h.row("Third Act")],
    ];

    let mut first = h.coordinator(FakeNavigator::new(pages.clone()), ExclusionRegistry::empty());
    let stats = first.run().await.unwrap();
    assert_eq!(stats.new_downloads, 3);
    assert_eq!(stats.pages_scanned, 2);
    drop(first);

    let history_before: Vec<String> = h.history().iter().map(str::to_string).collect();

    let mut second = h.coordinator(FakeNavigator::new(pages), ExclusionRegistry::empty());
    let stats = second.run().await.unwrap();
    assert_eq!(stats.new_downloads, 0);
    assert_eq!(stats.skipped_already, 3);

    let history_after: Vec<String> = h.history().iter().map(str::to_string).collect();
    assert_eq!(history_before, history_after);
}

#[tokio::test]
async fn test_upload_failure_keeps_local_copy_and_is_retried_from_disk() {
    let h = Harness::new().await;
    // The artifact is downloaded once; the retry uploads the kept local copy
    h.serve_artifact("Stubborn Act", 1).await;
    let pages = vec![vec![h.row("Stubborn Act")]];

    let mut failing = h.coordinator_with(
        h.settings(),
        FakeNavigator::new(pages.clone()),
        ExclusionRegistry::empty(),
        Box::new(RejectingSink),
    );
    let stats = failing.run().await.unwrap();

    assert_eq!(stats.upload_failures, 1);
    assert_eq!(stats.new_downloads, 0);
    assert!(h.local_copy("Stubborn Act").exists());
    assert!(!h.history().contains(&id("Stubborn Act")));
    assert!(failing.failures().contains(&id("Stubborn Act")));
    drop(failing);

    let mut settings = h.settings();
    settings.retry_failed = true;
    let mut retry = h.coordinator_with(
        settings,
        FakeNavigator::new(pages),
        ExclusionRegistry::empty(),
        Box::new(DirectorySink::new(h.archive())),
    );
    let stats = retry.run().await.unwrap();

    assert_eq!(stats.new_downloads, 1);
    assert!(!h.local_copy("Stubborn Act").exists());
    assert!(h.archive().join(id("Stubborn Act")).exists());
    assert!(h.history().contains(&id("Stubborn Act")));
}

#[tokio::test]
async fn test_missing_artifact_is_recorded_and_then_suppressed() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path(format!("/files/{}", slug("Ghost Act"))))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&h.server)
        .await;
    let pages = vec![vec![h.row("Ghost Act")]];

    let mut first = h.coordinator(FakeNavigator::new(pages.clone()), ExclusionRegistry::empty());
    let stats = first.run().await.unwrap();
    assert_eq!(stats.failed, 1);
    drop(first);

    let ledger = std::fs::read_to_string(&h.paths.failure_file).unwrap();
    assert!(ledger.starts_with(&format!("{}|not-found", id("Ghost Act"))));
    assert!(ledger.contains("all 1 candidate links failed"));

    let mut second = h.coordinator(FakeNavigator::new(pages), ExclusionRegistry::empty());
    let stats = second.run().await.unwrap();
    assert_eq!(stats.skipped_failed, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_stalls_after_consecutive_empty_pages() {
    let h = Harness::new().await;
    let pages: Vec<Vec<FakeRow>> = (0..15)
        .map(|i| if i % 2 == 0 { vec![] } else { vec![FakeRow::Malformed] })
        .collect();

    let mut coordinator = h.coordinator(FakeNavigator::new(pages), ExclusionRegistry::empty());
    let err = coordinator.run().await.unwrap_err();

    assert!(matches!(err, HarvestError::Stalled { empty_pages: 10 }));
    assert!(err.is_stall());
    assert_eq!(coordinator.stats().pages_scanned, 10);
    assert_eq!(coordinator.stats().malformed_rows, 5);
    assert_eq!(coordinator.progress().status, RunPhase::Stalled);
}

#[tokio::test]
async fn test_navigation_failure_saves_snapshot_and_propagates() {
    let h = Harness::new().await;
    h.seed_history(&["Known Act"]);
    let navigator = FakeNavigator::new(vec![vec![h.row("Known Act")], vec![h.row("Later Act")]])
        .failing_on(2);

    let mut coordinator = h.coordinator(navigator, ExclusionRegistry::empty());
    let err = coordinator.run().await.unwrap_err();

    assert!(matches!(
        err,
        HarvestError::Navigation(NavigationError::ListingMissing { .. })
    ));
    let snapshot = Path::new(&h.paths.diagnostics_dir).join("error_page_2.html");
    let content = std::fs::read_to_string(snapshot).unwrap();
    assert!(content.contains("fake listing page 2"));
    assert_eq!(coordinator.progress().status, RunPhase::Aborted);
}

#[tokio::test]
async fn test_reconcile_on_start_purges_newly_excluded_entries() {
    let h = Harness::new().await;
    h.seed_history(&["Repealed Act, 1920", "Kept Act"]);
    std::fs::create_dir_all(h.archive()).unwrap();
    std::fs::write(h.archive().join(id("Repealed Act, 1920")), pdf_body()).unwrap();
    std::fs::write(h.archive().join(id("Kept Act")), pdf_body()).unwrap();

    let mut settings = h.settings();
    settings.reconcile_on_start = true;
    let registry = ExclusionRegistry::from_names(["Repealed Act, 1920, as amended"]);
    let navigator = FakeNavigator::new(vec![vec![h.row("Repealed Act, 1920"), h.row("Kept Act")]]);

    let mut coordinator = h.coordinator_with(
        settings,
        navigator,
        registry,
        Box::new(DirectorySink::new(h.archive())),
    );
    let stats = coordinator.run().await.unwrap();

    let report = coordinator.take_reconcile_report().unwrap();
    assert_eq!(report.purged, vec![id("Repealed Act, 1920")]);
    assert_eq!(stats.purged, 1);
    assert_eq!(stats.skipped_excluded, 1);
    assert_eq!(stats.skipped_already, 1);
    assert!(!h.archive().join(id("Repealed Act, 1920")).exists());
    assert!(h.archive().join(id("Kept Act")).exists());
    assert!(!h.history().contains(&id("Repealed Act, 1920")));
}

fn listing_page(rows: &[(&str, &str)], next: &str) -> String {
    let body: String = rows
        .iter()
        .map(|(name, href)| {
            format!(
                r#"<tr><td class="title"><a href="{}">{}</a></td></tr>"#,
                href, name
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <div id="acts_info">Showing 1 to 2 of 3 entries</div>
        <table id="acts"><tbody>{}</tbody></table>
        {}
        </body></html>"#,
        body, next
    )
}

fn detail_page(artifact_href: &str) -> String {
    format!(
        r#"<html><body><h1>Act</h1><a href="{}">Download PDF</a></body></html>"#,
        artifact_href
    )
}

#[tokio::test]
async fn test_full_pipeline_over_html_catalog_is_recorded() {
    let h = Harness::new().await;
    let server = &h.server;

    Mock::given(method("GET"))
        .and(path("/acts"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(
            &[("Alpha Act", "/acts/alpha"), ("Beta Act", "/acts/beta")],
            r#"<a id="acts_next" href="/acts?page=2">Next</a>"#,
        )))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acts"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(
            &[("Gamma Act", "/acts/gamma")],
            r##"<a id="acts_next" class="disabled" href="#">Next</a>"##,
        )))
        .mount(server)
        .await;
    for name in ["alpha", "beta", "gamma"] {
        Mock::given(method("GET"))
            .and(path(format!("/acts/{}", name)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(detail_page(&format!("/files/{}.pdf", name))),
            )
            .mount(server)
            .await;
    }
    // Beta's artifact is not a PDF
    Mock::given(method("GET"))
        .and(path("/files/beta.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login required</html>"))
        .expect(1)
        .mount(server)
        .await;
    for name in ["alpha", "gamma"] {
        Mock::given(method("GET"))
            .and(path(format!("/files/{}.pdf", name)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body()))
            .expect(1)
            .mount(server)
            .await;
    }

    let p = &h.paths;
    let toml = format!(
        r##"
[run]
row-delay-ms = 0

[paths]
history-file = "{history}"
failure-file = "{failed}"
progress-file = "{progress}"
exclusion-file = "{excluded}"
download-dir = "{downloads}"
diagnostics-dir = "{diagnostics}"
run-database = "{database}"

[fetch]
retry-delay-ms = 0
detail-retry-delay-ms = 0
min-bytes = 10

[storage]
target = "directory"
directory = "{archive}"

[catalog]
engine = "html"
start-url = "{uri}/acts?page=1"
timeout-secs = 5
listing-selector = "table#acts"
row-selector = "table#acts tbody tr"
link-selector = "td.title a"
next-selector = "a#acts_next"
total-selector = "#acts_info"
"##,
        history = p.history_file,
        failed = p.failure_file,
        progress = p.progress_file,
        excluded = p.exclusion_file,
        downloads = p.download_dir,
        diagnostics = p.diagnostics_dir,
        database = p.run_database,
        archive = h.archive().display(),
        uri = server.uri(),
    );
    let config = parse_config(&toml).unwrap();

    let report = run_recorded(&config, "test-hash").await.unwrap();
    let session = report.session.unwrap();
    assert_eq!(session.pages_scanned, 2);
    assert_eq!(session.new_downloads, 2);
    assert_eq!(session.failed, 1);

    assert!(h.archive().join(id("Alpha Act")).exists());
    assert!(h.archive().join(id("Gamma Act")).exists());
    assert!(!h.archive().join(id("Beta Act")).exists());

    let ledger = std::fs::read_to_string(&p.failure_file).unwrap();
    assert!(ledger.contains(&format!("{}|validation", id("Beta Act"))));

    let storage = SqliteStorage::new(Path::new(&p.run_database)).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.mode, "ingest");
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.counters.new_downloads, 2);
    assert_eq!(run.counters.failed, 1);
}

#[tokio::test]
async fn test_direct_jump_is_preferred_over_next_page() {
    let h = Harness::new().await;
    for name in ["First Act", "Second Act", "Third Act"] {
        h.serve_artifact(name, 1).await;
    }
    let navigator = FakeNavigator::new(vec![
        vec![h.row("First Act")],
        vec![h.row("Second Act")],
        vec![h.row("Third Act")],
    ]);
    let calls = navigator.calls();

    let mut coordinator = h.coordinator(navigator, ExclusionRegistry::empty());
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.pages_scanned, 3);
    assert_eq!(stats.new_downloads, 3);
    assert_eq!(calls.jumps(), 2);
    assert_eq!(calls.next_pages(), 0);
}

#[tokio::test]
async fn test_next_page_is_used_when_jumps_are_unsupported() {
    let h = Harness::new().await;
    for name in ["First Act", "Second Act", "Third Act"] {
        h.serve_artifact(name, 1).await;
    }
    let navigator = FakeNavigator::new(vec![
        vec![h.row("First Act")],
        vec![h.row("Second Act")],
        vec![h.row("Third Act")],
    ])
    .with_jumps(JumpMode::Unsupported);
    let calls = navigator.calls();

    let mut coordinator = h.coordinator(navigator, ExclusionRegistry::empty());
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.pages_scanned, 3);
    assert_eq!(stats.new_downloads, 3);
    assert_eq!(calls.jumps(), 0);
    assert_eq!(calls.next_pages(), 2);
    assert_eq!(coordinator.progress().current_page, 3);
}

#[tokio::test]
async fn test_failed_jump_falls_back_to_next_page() {
    let h = Harness::new().await;
    h.serve_artifact("First Act", 1).await;
    h.serve_artifact("Second Act", 1).await;
    let navigator = FakeNavigator::new(vec![vec![h.row("First Act")], vec![h.row("Second Act")]])
        .with_jumps(JumpMode::Failing);
    let calls = navigator.calls();

    let mut coordinator = h.coordinator(navigator, ExclusionRegistry::empty());
    let stats = coordinator.run().await.unwrap();

    assert_eq!(calls.jumps(), 1);
    assert_eq!(calls.next_pages(), 1);
    assert_eq!(stats.pages_scanned, 2);
    assert!(h.history().contains(&id("Second Act")));
    assert_eq!(coordinator.progress().status, RunPhase::Completed);
}

#[tokio::test]
async fn test_detail_resolution_is_retried_until_it_succeeds() {
    let h = Harness::new().await;
    h.serve_artifact("Slow Detail Act", 1).await;
    let navigator = FakeNavigator::new(vec![vec![h.row("Slow Detail Act")]]).failing_details(2);
    let calls = navigator.calls();

    let settings = CrawlSettings {
        detail_attempts: 3,
        ..h.settings()
    };
    let mut coordinator = h.coordinator_with(
        settings,
        navigator,
        ExclusionRegistry::empty(),
        Box::new(DirectorySink::new(h.archive())),
    );
    let stats = coordinator.run().await.unwrap();

    assert_eq!(calls.resolves(), 3);
    assert_eq!(stats.new_downloads, 1);
    assert_eq!(stats.failed, 0);
    assert!(h.history().contains(&id("Slow Detail Act")));
    assert_eq!(coordinator.failures().entry_count(), 0);
}

#[tokio::test]
async fn test_detail_resolution_gives_up_after_configured_attempts() {
    let h = Harness::new().await;
    h.serve_artifact("Dead Detail Act", 0).await;
    let navigator = FakeNavigator::new(vec![vec![h.row("Dead Detail Act")]]).failing_details(10);
    let calls = navigator.calls();

    let mut coordinator = h.coordinator(navigator, ExclusionRegistry::empty());
    let stats = coordinator.run().await.unwrap();

    assert_eq!(calls.resolves(), 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.new_downloads, 0);

    let ledger = std::fs::read_to_string(&h.paths.failure_file).unwrap();
    assert!(ledger.starts_with(&format!("{}|detail-unavailable", id("Dead Detail Act"))));
}
