//! League-Crawler main entry point
//!
//! This is the command-line interface for the League-Crawler match crawler.

use anyhow::{Context, Result};
use clap::Parser;
use league_crawler::api::Routing;
use league_crawler::config::{load_config_with_hash, validate, Config};
use league_crawler::crawler::crawl;
use league_crawler::output::{load_statistics, print_report, print_statistics};
use league_crawler::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// League-Crawler: a breadth-first match crawler
///
/// League-Crawler starts from one summoner, crawls the ranked matches they
/// played, then the players they met there, and so on, storing every match
/// and player profile until a match or player quota is reached.
#[derive(Parser, Debug)]
#[command(name = "league-crawler")]
#[command(version)]
#[command(about = "A breadth-first match crawler", long_about = None)]
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

    /// Validate config and show the crawl plan without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Summoner name to start from, overriding the config file
    #[arg(long, value_name = "NAME")]
    start_player: Option<String>,

    /// Match quota, overriding the config file
    #[arg(long, value_name = "N")]
    min_matches: Option<usize>,

    /// Player quota, overriding the config file
    #[arg(long, value_name = "N")]
    min_players: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("league_crawler=info,warn"),
            1 => EnvFilter::new("league_crawler=debug,info"),
            2 => EnvFilter::new("league_crawler=trace,debug"),
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

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(name) = &cli.start_player {
        config.crawler.start_player = name.clone();
    }
    if let Some(n) = cli.min_matches {
        config.crawler.min_matches = n;
    }
    if let Some(n) = cli.min_players {
        config.crawler.min_players = n;
    }
    validate(config).context("Invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &Config) -> Result<()> {
    let crawler = &config.crawler;
    let routing = Routing::for_platform(&crawler.platform)?;

    println!("=== League-Crawler Dry Run ===\n");

    println!("Crawl:");
    println!("  Start player: {}", crawler.start_player);
    println!(
        "  Platform: {} ({} / {})",
        crawler.platform, routing.platform, routing.region
    );
    println!("  Workers: {}", crawler.worker_count());
    println!(
        "  Quota: {} matches or {} players",
        crawler.effective_min_matches(),
        crawler.effective_min_players()
    );
    println!("  Match queue: {}", crawler.queue);

    println!("\nEndpoints:");
    match &config.api.base_url {
        Some(base) => println!("  Override: {}", base),
        None => {
            println!("  Summoners: {}", routing.platform_host());
            println!("  Matches: {}", routing.regional_host());
        }
    }
    println!("  API key variable: {}", config.api.key_env);

    let rate = &config.rate_limit;
    println!("\nRequests:");
    println!(
        "  Budget: {} per {}s (burst {})",
        rate.requests, rate.per_seconds, rate.burst
    );
    println!("  Max attempts: {}", crawler.max_attempts);
    println!("  Backoff unit: {}ms", rate.backoff_unit_ms);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage).context("Failed to read statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> Result<()> {
    tracing::info!(
        "Crawling {} from {} with concurrency {}",
        config.crawler.platform,
        config.crawler.start_player,
        config.crawler.concurrency
    );

    let report = crawl(config, config_hash).await.context("Crawl failed")?;
    print_report(&report);

    Ok(())
}
