//! hubstatus - HuBMAP dataset status reports
//!
//! A CLI tool that fetches dataset-status records from the HuBMAP
//! ingest API and writes count tables of the primary datasets.
//!
//! Exit codes:
//!   0 - Success (including an empty report after a failed fetch)
//!   1 - Runtime error (config, --strict fetch failure, malformed record, write failure)

use anyhow::{Context, Result};
use hubstatus::cli::{Args, OutputFormat};
use hubstatus::config::{Config, CONFIG_FILE_NAME};
use hubstatus::fetch::{RecordCache, StatusClient};
use hubstatus::report;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so the file can turn on verbose output
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("hubstatus v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .hubstatus.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the source URL, timeout, cache and views.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Generate the report once, or repeatedly with --watch. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let client = StatusClient::new(config.client_config())?;
    let cache = RecordCache::new(client, config.cache.ttl());

    let Some(interval) = args.watch else {
        generate(&args, &config, &cache).await?;
        return Ok(0);
    };

    info!("Regenerating the report every {}s (Ctrl-C to stop)", interval);
    if config.cache.ttl().map_or(true, |ttl| ttl.as_secs() > interval) {
        warn!("Cache TTL is longer than the watch interval; some runs will reuse cached data");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = generate(&args, &config, &cache).await {
                    error!("Report failed: {:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    Ok(0)
}

/// Fetch, aggregate and write one report.
async fn generate(args: &Args, config: &Config, cache: &RecordCache) -> Result<()> {
    let start_time = Instant::now();

    println!("📥 Fetching dataset status: {}", config.source.url);
    let spinner = fetch_spinner(args.quiet);
    let outcome = cache.get_or_empty().await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if let Some(error) = outcome.error() {
        if config.report.strict {
            return Err(error.clone()).context("Fetching dataset status failed");
        }
        println!("⚠️  Fetch failed, writing a report with no datasets: {}", error);
    }

    let mut report = report::build_report(&outcome, &config.source.url, &config.report)
        .context("Failed to aggregate dataset records")?;
    report.metadata.duration_seconds = start_time.elapsed().as_secs_f64();

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = Path::new(&config.general.output);
    report::write_report(&output, output_path)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!("\n📊 Dataset Summary:");
    println!("   Datasets fetched: {}", report.metadata.records_fetched);
    println!(
        "   Primary: {} | Derived: {} | Skipped: {}",
        report.metadata.primary_datasets,
        report.metadata.derived_datasets,
        report.metadata.skipped_records
    );
    for view in &report.views {
        println!(
            "   - {}: {} rows x {} columns",
            view.title,
            view.matrix.rows().len(),
            view.matrix.columns().len()
        );
    }
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
    println!("\n✅ Report saved to: {}", output_path.display());

    Ok(())
}

fn fetch_spinner(quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message("waiting for the ingest API...");
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!(
                "⚠️  Failed to load {}, using defaults: {:#}",
                CONFIG_FILE_NAME, e
            );
            Ok(Config::default())
        }
    }
}
