//! Catalog-Harvester main entry point
//!
//! This is the command-line interface for the Catalog-Harvester ingestion engine.

use anyhow::Context;
use catalog_harvester::catalog::ExclusionRegistry;
use catalog_harvester::config::{load_config_with_hash, validate, Config, RunMode};
use catalog_harvester::crawler::run_recorded;
use catalog_harvester::output::{load_statistics, print_run_summary, print_statistics};
use catalog_harvester::state::{FailureLedger, HistoryStore, ProgressTracker};
use catalog_harvester::storage::SqliteStorage;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-Harvester: an incremental catalog crawl-and-ingest engine
///
/// Catalog-Harvester sweeps a paginated public catalog, skips entries that are
/// already stored or excluded, fetches the artifact behind each new entry and
/// uploads it to durable storage. Interrupted runs resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvester")]
#[command(version)]
#[command(about = "An incremental catalog crawl-and-ingest engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the run mode from the configuration
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Retry rows recorded in the failure ledger instead of skipping them
    #[arg(long)]
    retry_failed: bool,

    /// Validate config and show loaded state without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show recent runs from the run ledger and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Full,
    Ingest,
    ExclusionRefresh,
    Reconcile,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Full => RunMode::Full,
            ModeArg::Ingest => RunMode::Ingest,
            ModeArg::ExclusionRefresh => RunMode::ExclusionRefresh,
            ModeArg::Reconcile => RunMode::Reconcile,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(mode) = cli.mode {
        config.run.mode = mode.into();
    }
    if cli.retry_failed {
        config.run.retry_failed = true;
    }
    validate(&config).context("invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_run(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvester=info,warn"),
            1 => EnvFilter::new("catalog_harvester=debug,info"),
            2 => EnvFilter::new("catalog_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration and state sizes
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Catalog-Harvester Dry Run ===\n");

    println!("Run:");
    println!("  Mode: {}", config.run.mode);
    println!("  Retry failed: {}", config.run.retry_failed);
    println!("  Skip-ahead threshold: {}", config.run.skip_ahead_threshold);
    println!("  Max empty pages: {}", config.run.max_empty_pages);
    println!("  Reconcile on start: {}", config.run.reconcile_on_start);

    println!("\nCatalog:");
    println!("  Engine: {:?}", config.catalog.engine);
    println!("  Start URL: {}", config.catalog.start_url);
    if let Some(template) = &config.catalog.page_url_template {
        println!("  Page template: {}", template);
    }
    if let Some(exclusion) = &config.exclusion_catalog {
        println!("  Exclusion catalog: {}", exclusion.start_url);
    }

    println!("\nFetch:");
    println!("  Attempts per URL: {}", config.fetch.max_attempts);
    println!("  Artifact extension: .{}", config.fetch.artifact_extension);
    println!("  Download dir: {}", config.paths.download_dir);

    println!("\nStorage:");
    println!("  Target: {:?}", config.storage.target);
    if let Some(directory) = &config.storage.directory {
        println!("  Directory: {}", directory);
    }
    if let Some(base_url) = &config.storage.base_url {
        println!("  Base URL: {}", base_url);
    }
    if let Some(bucket) = &config.storage.bucket {
        println!("  Bucket: {}", bucket);
    }

    let history = HistoryStore::open(Path::new(&config.paths.history_file))?;
    let failures = FailureLedger::open(Path::new(&config.paths.failure_file))?;
    let registry = ExclusionRegistry::load(Path::new(&config.paths.exclusion_file))?;
    let progress = ProgressTracker::load(Path::new(&config.paths.progress_file))?;

    println!("\nState:");
    println!("  Ingested identifiers: {} ({})", history.len(), config.paths.history_file);
    println!(
        "  Failed identifiers: {} ({} entries)",
        failures.distinct_count(),
        failures.entry_count()
    );
    println!("  Exclusion entries: {}", registry.len());
    match progress {
        Some(snapshot) => println!(
            "  Last progress: page {}, row {}, {:?}",
            snapshot.current_page, snapshot.current_row, snapshot.status
        ),
        None => println!("  Last progress: none"),
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows recent runs from the run ledger
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.paths.run_database);

    let storage = SqliteStorage::new(Path::new(&config.paths.run_database))
        .context("failed to open the run ledger")?;
    let stats = load_statistics(&storage, 20)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_run(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Starting {} run (retry-failed: {})",
        config.run.mode,
        config.run.retry_failed
    );

    match run_recorded(config, config_hash).await {
        Ok(report) => {
            print_run_summary(&report);
            Ok(())
        }
        Err(e) if e.is_stall() => {
            tracing::error!("Harvest stopped: {}", e);
            Err(e).context("the crawl ran past the end of valid catalog data")
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
