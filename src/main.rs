//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the Catalog-Harvest crawler.

use anyhow::{Context, Result};
use catalog_harvest::config::{parse_config, validate, Config, OutputFormat};
use catalog_harvest::crawler::{Orchestrator, RunOutcome, RunReport};
use catalog_harvest::output::{print_statistics, read_manual_records, CheckpointStatistics};
use catalog_harvest::storage::{CheckpointStore, JsonCheckpointStore};
use catalog_harvest::ConfigFingerprint;
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: a resumable catalog crawler
///
/// Catalog-Harvest walks a site's year/category listing pages, collects
/// one record per unique title, enriches records from their detail pages,
/// and checkpoints after every task so an interrupted run can be resumed.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// First year to crawl (inclusive)
    #[arg(long)]
    start_year: Option<i32>,

    /// Last year to crawl (inclusive)
    #[arg(long)]
    end_year: Option<i32>,

    /// Categories to crawl, in order
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    categories: Option<Vec<String>>,

    /// Crawl categories in the given order instead of priority categories first
    #[arg(long)]
    no_prefer_priority: bool,

    /// Maximum concurrent detail page fetches
    #[arg(long)]
    workers: Option<usize>,

    /// Politeness delay between requests in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Pause after this many resolved tasks (0 disables)
    #[arg(long)]
    pause_after: Option<usize>,

    /// Resume from the checkpoint
    #[arg(long)]
    resume: bool,

    /// Only retry tasks recorded as failed in the checkpoint
    #[arg(long)]
    failed_only: bool,

    /// Checkpoint file path
    #[arg(long, value_name = "PATH")]
    checkpoint: Option<String>,

    /// Record output file path
    #[arg(long, value_name = "PATH")]
    output: Option<String>,

    /// Record output format (inferred from the output path when omitted)
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Failed-task report path
    #[arg(long, value_name = "PATH")]
    failed_report: Option<String>,

    /// Merge records from a CSV file into the checkpoint and exit
    #[arg(long, value_name = "CSV")]
    import_records: Option<PathBuf>,

    /// Mark task keys (<year>:<category>) as completed and exit
    #[arg(long, value_name = "KEY", num_args = 1..)]
    mark_completed: Vec<String>,

    /// Validate config and show the task plan without crawling
    #[arg(long, conflicts_with_all = ["stats", "import_records", "mark_completed"])]
    dry_run: bool,

    /// Show statistics from the checkpoint and exit
    #[arg(long, conflicts_with_all = ["dry_run", "import_records", "mark_completed"])]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.import_records.is_some() || !cli.mark_completed.is_empty() {
        handle_overrides(config, &cli)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
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

/// Loads the config file (if any), applies command-line overrides, and
/// validates the result
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            parse_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(year) = cli.start_year {
        config.crawl.start_year = year;
    }
    if let Some(year) = cli.end_year {
        config.crawl.end_year = year;
    }
    if let Some(categories) = &cli.categories {
        config.crawl.categories = categories.clone();
    }
    if cli.no_prefer_priority {
        config.crawl.prefer_priority = false;
    }
    if let Some(workers) = cli.workers {
        config.fetch.detail_workers = workers;
    }
    if let Some(delay) = cli.delay_ms {
        config.fetch.politeness_delay_ms = delay;
    }
    if let Some(pause_after) = cli.pause_after {
        config.run.pause_after = pause_after;
    }
    if cli.resume {
        config.run.resume = true;
    }
    if cli.failed_only {
        config.run.failed_only = true;
    }
    if let Some(path) = &cli.checkpoint {
        config.run.checkpoint_path = path.clone();
    }
    if let Some(path) = &cli.output {
        config.run.output_path = path.clone();
    }
    if let Some(format) = cli.format {
        config.run.output_format = Some(format.into());
    }
    if let Some(path) = &cli.failed_report {
        config.run.failed_report_path = path.clone();
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: validates config and shows the task plan
fn handle_dry_run(config: &Config) {
    use catalog_harvest::crawler::tasks_for_config;

    println!("=== Catalog-Harvest Dry Run ===\n");

    println!("Crawl Configuration:");
    println!(
        "  Years: {}-{}",
        config.crawl.start_year, config.crawl.end_year
    );
    println!("  Categories: {}", config.crawl.categories.join(", "));
    if config.crawl.prefer_priority {
        println!(
            "  Priority categories: {}",
            config.crawl.priority_categories.join(", ")
        );
    }

    println!("\nFetching:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Detail workers: {}", config.fetch.detail_workers);
    println!("  Politeness delay: {}ms", config.fetch.politeness_delay_ms);
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);

    println!("\nOutput:");
    println!("  Checkpoint: {}", config.run.checkpoint_path);
    println!(
        "  Records: {} ({:?})",
        config.run.output_path,
        config.run.format()
    );
    println!("  Failed report: {}", config.run.failed_report_path);

    let tasks = tasks_for_config(&config.crawl);
    println!("\nTask Plan ({} tasks):", tasks.len());
    for task in &tasks {
        println!("  - {}", task);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Fingerprint: {}",
        ConfigFingerprint::from_config(config).digest()
    );
}

/// Handles the --stats mode: shows statistics from the checkpoint
fn handle_stats(config: &Config) -> Result<()> {
    use catalog_harvest::crawler::tasks_for_config;

    println!("Checkpoint: {}\n", config.run.checkpoint_path);

    let store = JsonCheckpointStore::new(&config.run.checkpoint_path);
    let state = store
        .read()
        .context("Failed to read checkpoint")?
        .with_context(|| format!("No checkpoint found at {}", config.run.checkpoint_path))?;

    if state.config_fingerprint != ConfigFingerprint::from_config(config) {
        tracing::warn!(
            "Checkpoint belongs to a different configuration ({}); task totals may not match",
            state.config_fingerprint
        );
    }

    let stats = CheckpointStatistics::from_checkpoint(&state, tasks_for_config(&config.crawl).len());
    print_statistics(&stats);

    Ok(())
}

/// Handles --import-records / --mark-completed: applies the overrides to the
/// checkpoint and exits without crawling
fn handle_overrides(mut config: Config, cli: &Cli) -> Result<()> {
    config.run.resume = true;
    let mut orchestrator = Orchestrator::new(config).context("Failed to open checkpoint")?;

    if let Some(path) = &cli.import_records {
        let records = read_manual_records(path)
            .with_context(|| format!("Failed to import records from {}", path.display()))?;
        let summary = orchestrator.import_records(records);
        println!(
            "✓ Imported {} records ({} new, {} replaced)",
            summary.added + summary.replaced,
            summary.added,
            summary.replaced
        );
    }

    for key in &cli.mark_completed {
        orchestrator.mark_completed(key)?;
        println!("✓ Marked {} completed", key);
    }

    orchestrator.write_outputs()?;
    orchestrator.persist().context("Failed to save checkpoint")?;
    Ok(())
}

/// Exit status when a second interrupt stops the process immediately
const FORCED_EXIT_CODE: i32 = 130;

/// Waits for interrupt signals
///
/// The first signal cancels `token`, so the run stops at the next task
/// boundary with everything saved. A second signal means the operator does
/// not want to wait for the running task.
///
/// # Returns
///
/// * `true` - A second signal arrived
/// * `false` - The signal source failed
async fn watch_interrupts<S, F>(token: CancellationToken, mut next_signal: S) -> bool
where
    S: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_signal().await {
        tracing::warn!("Unable to listen for interrupts: {}", e);
        return false;
    }
    tracing::warn!("Interrupt received; stopping after the current task (interrupt again to exit now)");
    token.cancel();

    next_signal().await.is_ok()
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<()> {
    let checkpoint_path = config.run.checkpoint_path.clone();
    let mut orchestrator = match Orchestrator::new(config) {
        Ok(o) => o,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            return Err(e.into());
        }
    };

    let token = orchestrator.cancellation_token();
    let resume_path = checkpoint_path.clone();
    tokio::spawn(async move {
        if watch_interrupts(token, tokio::signal::ctrl_c).await {
            eprintln!("\nSecond interrupt received; exiting without finishing the current task.");
            eprintln!("Progress up to the last finished task is in {}. Continue with:", resume_path);
            eprintln!("  catalog-harvest --resume --checkpoint {}", resume_path);
            std::process::exit(FORCED_EXIT_CODE);
        }
    });

    let report = match orchestrator.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            return Err(e.into());
        }
    };

    print_report(&report, &checkpoint_path);
    Ok(())
}

fn print_report(report: &RunReport, checkpoint_path: &str) {
    println!("\n=== Run Summary ===");
    println!("  Outcome: {:?}", report.outcome);
    println!(
        "  Tasks: {} completed, {} failed, {} skipped",
        report.tasks_completed, report.tasks_failed, report.tasks_skipped
    );
    println!(
        "  Records: {} new, {} total",
        report.records_added, report.records_total
    );
    println!(
        "  Details: {} fetched, {} failed",
        report.details_fetched, report.detail_failures
    );

    match report.outcome {
        RunOutcome::Finished if report.tasks_failed > 0 => {
            println!("\nSome tasks failed. Retry them with:");
            println!("  catalog-harvest --resume --failed-only --checkpoint {}", checkpoint_path);
        }
        RunOutcome::Finished => {}
        RunOutcome::Paused | RunOutcome::Interrupted => {
            println!("\nProgress saved to {}. Continue with:", checkpoint_path);
            println!("  catalog-harvest --resume --checkpoint {}", checkpoint_path);
        }
    }
}
