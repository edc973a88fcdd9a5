//! Edition-Scout main entry point
//!
//! This is the command-line interface for the Edition-Scout stock finder.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use edition_scout::config::{load_config_with_hash, Config};
use edition_scout::input::{read_covered, read_item_list, read_listing_seed, CoveredSet};
use edition_scout::output::{load_statistics, print_statistics, write_report};
use edition_scout::{AccumulationStore, Discovery, Scout};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code of a run that finished with dropped items
const EXIT_PARTIAL: u8 = 2;

/// Exit code of a fatal input, config or storage error
const EXIT_FATAL: u8 = 1;

/// Edition-Scout: series and author stock finder
///
/// Edition-Scout walks a catalog's series or author listing (or a list of
/// item pages), resolves every book to its ISBNs, checks second-hand
/// retailers for stock, and keeps the results in an incremental store that
/// is rendered into a CSV report.
#[derive(Parser, Debug)]
#[command(name = "edition-scout")]
#[command(version)]
#[command(about = "Series and author stock finder", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// How items are discovered
    #[arg(long, value_enum, required_unless_present_any = ["stats", "report_only"])]
    mode: Option<Mode>,

    /// Seed file: listing seed for series/author, item list for items
    #[arg(long, value_name = "FILE", required_unless_present_any = ["stats", "report_only"])]
    input: Option<PathBuf>,

    /// File of item names or URLs to skip
    #[arg(long, value_name = "FILE")]
    covered: Option<PathBuf>,

    /// Discard stored items before running
    #[arg(long)]
    fresh: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics from the store and exit
    #[arg(long, conflicts_with_all = ["report_only", "fresh"])]
    stats: bool,

    /// Rewrite the report from the store and exit
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    report_only: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Paginated series listing
    Series,
    /// Paginated author listing
    Author,
    /// Explicit list of item pages
    Items,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        handle_stats(&config)?;
        return Ok(ExitCode::SUCCESS);
    }
    if cli.report_only {
        handle_report_only(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let (Some(mode), Some(input)) = (cli.mode, cli.input.as_deref()) else {
        anyhow::bail!("--mode and --input are required for a run");
    };

    handle_run(
        config,
        config_hash,
        mode,
        input,
        cli.covered.as_deref(),
        cli.fresh,
    )
    .await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("edition_scout=info,warn"),
            1 => EnvFilter::new("edition_scout=debug,info"),
            2 => EnvFilter::new("edition_scout=trace,debug"),
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

fn open_store(config: &Config) -> Result<AccumulationStore> {
    let path = Path::new(&config.output.database_path);
    AccumulationStore::load(path).with_context(|| format!("Failed to open store {}", path.display()))
}

/// Handles the --stats mode: shows statistics from the store
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(config)?;
    let stats = load_statistics(store.backend())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --report-only mode: rewrites the report without scouting
fn handle_report_only(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let path = Path::new(&config.output.report_path);

    let rows = write_report(store.get_all(), path)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    println!("✓ Report with {} rows written to: {}", rows, path.display());

    Ok(())
}

/// Handles a scouting run
async fn handle_run(
    config: Config,
    config_hash: String,
    mode: Mode,
    input: &Path,
    covered_path: Option<&Path>,
    fresh: bool,
) -> Result<ExitCode> {
    let mut covered = match covered_path.map(read_covered) {
        Some(Ok(covered)) => covered,
        Some(Err(e)) => {
            tracing::warn!("{}; continuing without a covered list", e);
            CoveredSet::new()
        }
        None => CoveredSet::new(),
    };

    let discovery = match mode {
        Mode::Series | Mode::Author => {
            let seed = read_listing_seed(input)
                .with_context(|| format!("Failed to read listing seed {}", input.display()))?;
            covered.extend(seed.covered);
            if mode == Mode::Series {
                Discovery::Series {
                    seed_url: seed.url,
                }
            } else {
                Discovery::Author {
                    seed_url: seed.url,
                }
            }
        }
        Mode::Items => Discovery::Items(
            read_item_list(input)
                .with_context(|| format!("Failed to read item list {}", input.display()))?,
        ),
    };
    tracing::info!("{} covered entries", covered.len());

    let mut store = open_store(&config)?;
    if fresh {
        tracing::info!("Starting fresh (discarding {} stored items)", store.len());
        store.clear().context("Failed to clear store")?;
    }

    let mut scout = Scout::new(config, config_hash, store, covered)?;
    let summary = scout.run(discovery).await.context("Run failed")?;

    println!("✓ {}", summary);
    if summary.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        for failure in &summary.dropped {
            println!("  dropped {}: {}", failure.input.url, failure.reason);
        }
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}
