//! Device-Resolver main entry point
//!
//! This is the command-line interface for the device record resolver.

use anyhow::{bail, Context};
use clap::Parser;
use device_resolver::batch::{load_batch_items, load_statistics, print_statistics, print_summary, run_batch};
use device_resolver::config::{load_config_with_hash, Config};
use device_resolver::record::{BatchItem, Identifier};
use device_resolver::storage::open_store;
use device_resolver::normalize_name;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Identifiers listed by --dry-run
const DRY_RUN_PREVIEW: usize = 20;

/// Device-Resolver: canonical device records from manufacturer model codes
///
/// Each model code is looked up through several external catalogs in a fixed
/// fallback order; the first complete answer is stored in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "device-resolver")]
#[command(version = "1.0.0")]
#[command(about = "Resolves manufacturer model codes into device records", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Text or CSV file with one model code per line
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Model code to resolve (repeatable)
    #[arg(short, long = "model", value_name = "CODE")]
    models: Vec<String>,

    /// Process at most N identifiers (overrides per-item-limit)
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and input and show what would be resolved
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).context("invalid configuration");
        }
    };

    if let Some(limit) = cli.limit {
        config.resolver.per_item_limit = Some(limit as usize);
    }

    if cli.stats {
        return handle_stats(&config);
    }

    let items = collect_items(cli.input.as_deref(), &cli.models)?;

    if cli.dry_run {
        handle_dry_run(&config, &items);
        return Ok(());
    }

    handle_run(&config, items, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("device_resolver=info,warn"),
            1 => EnvFilter::new("device_resolver=debug,info"),
            2 => EnvFilter::new("device_resolver=trace,debug"),
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

/// Gathers identifiers from the input file and --model flags, file first
fn collect_items(input: Option<&Path>, models: &[String]) -> anyhow::Result<Vec<BatchItem>> {
    let mut items = match input {
        Some(path) => load_batch_items(path)
            .with_context(|| format!("failed to read input file {}", path.display()))?,
        None => Vec::new(),
    };

    let mut seen: HashSet<Identifier> = items.iter().map(|item| item.identifier.clone()).collect();
    for model in models {
        let Some(identifier) = Identifier::parse(model) else {
            bail!("empty model code given with --model");
        };
        if seen.insert(identifier.clone()) {
            items.push(BatchItem::new(identifier));
        }
    }

    if items.is_empty() {
        bail!("no identifiers to resolve: pass --input FILE or --model CODE");
    }
    Ok(items)
}

/// Handles the --dry-run mode: shows the plan without touching any source
fn handle_dry_run(config: &Config, items: &[BatchItem]) {
    println!("=== Device-Resolver Dry Run ===\n");

    println!("Resolver Configuration:");
    println!("  Browser sessions: {}", config.resolver.pool_size);
    println!("  Workers: {}", config.resolver.workers);
    println!("  Base delay: {:.1}s", config.resolver.base_delay_seconds);
    println!("  Acquire timeout: {}s", config.resolver.acquire_timeout_seconds);
    println!("  Strategy timeout: {}s", config.resolver.strategy_timeout_seconds);
    println!("  Date enrichment: {}", config.resolver.enrich_missing_dates);
    println!("  Skip resolved: {}", config.resolver.skip_resolved);
    if let Some(limit) = config.resolver.per_item_limit {
        println!("  Per-item limit: {}", limit);
    }

    println!("\nSources:");
    println!("  Primary: {}", config.sources.primary_base_url);
    println!("  Secondary: {}", config.sources.secondary_base_url);
    println!("  Search: {}", config.sources.search_base_url);
    println!("  Known mappings from config: {}", config.known_mappings.len());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let planned = config
        .resolver
        .per_item_limit
        .map_or(items.len(), |limit| limit.min(items.len()));

    println!("\nIdentifiers ({} of {}):", planned, items.len());
    for item in items.iter().take(planned.min(DRY_RUN_PREVIEW)) {
        let brand = item.brand();
        println!(
            "  - {} [{}] -> query '{}'",
            item.identifier,
            brand,
            normalize_name(item.identifier.as_str(), Some(brand))
        );
    }
    if planned > DRY_RUN_PREVIEW {
        println!("  ... and {} more", planned - DRY_RUN_PREVIEW);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would resolve {} identifiers", planned);
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))
        .context("failed to open result database")?;
    let stats = load_statistics(&store).context("failed to read statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main resolution run
async fn handle_run(config: &Config, items: Vec<BatchItem>, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Resolving {} identifiers with {} browser session(s)",
        items.len(),
        config.resolver.pool_size
    );

    match run_batch(config, items, config_hash).await {
        Ok(summary) => {
            tracing::info!(
                "Run finished: {} resolved, {} failed, {} skipped",
                summary.succeeded,
                summary.failed,
                summary.skipped
            );
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e).context("batch run failed")
        }
    }
}
