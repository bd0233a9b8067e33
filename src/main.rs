//! Finder main entry point
//!
//! Crawls from a first URL through the accepted domains and saves every
//! image it finds.

use anyhow::Context;
use clap::Parser;
use reqwest::Method;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;
use webcrawler::config::{load_config_with_hash, validation::validate, Config};
use webcrawler::finder::ComponentFactory;
use webcrawler::monitor::{spawn_monitor, MonitorSettings};
use webcrawler::Scheduler;

/// Finder: an image crawler
///
/// Finder starts at one URL, follows links and image sources within the
/// accepted primary domains up to a maximum depth, and saves every image it
/// downloads into the output directory.
#[derive(Parser, Debug)]
#[command(name = "finder")]
#[command(version)]
#[command(about = "A concurrent image crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// The first URL to access (overrides `first-url`)
    #[arg(long, value_name = "URL")]
    first_url: Option<String>,

    /// Accepted primary domains, comma-separated (overrides `accepted-domains`)
    #[arg(long, value_name = "DOMAINS", value_delimiter = ',')]
    domains: Option<Vec<String>>,

    /// Maximum crawl depth (overrides `max-depth`)
    #[arg(long)]
    depth: Option<u32>,

    /// Directory to save images into (overrides `[output] dir`)
    #[arg(long, value_name = "DIR")]
    dir: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(first_url) = &self.first_url {
            config.first_url = first_url.clone();
        }
        if let Some(domains) = &self.domains {
            let domains = domains
                .iter()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
            config.request.accepted_domains = Some(domains);
        }
        if let Some(depth) = self.depth {
            config.request.max_depth = depth;
        }
        if let Some(dir) = &self.dir {
            config.output.dir = dir.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    cli.apply_overrides(&mut config);
    validate(&config).context("invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webcrawler=info,finder=info,warn"),
            1 => EnvFilter::new("webcrawler=debug,finder=debug,info"),
            2 => EnvFilter::new("webcrawler=trace,finder=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Finder Dry Run ===\n");

    println!("First URL: {}", config.first_url);

    println!("\nRequest:");
    let domains = config.request.accepted_domains.as_deref().unwrap_or_default();
    println!("  Accepted domains ({}):", domains.len());
    for domain in domains {
        println!("    - {}", domain);
    }
    println!("  Max depth: {}", config.request.max_depth);

    let data = &config.data;
    println!("\nBuffer pools (capacity x max buffers):");
    println!("  Request: {} x {}", data.req_buffer_cap, data.req_max_buffer_number);
    println!("  Response: {} x {}", data.resp_buffer_cap, data.resp_max_buffer_number);
    println!("  Item: {} x {}", data.item_buffer_cap, data.item_max_buffer_number);
    println!("  Error: {} x {}", data.error_buffer_cap, data.error_max_buffer_number);

    println!("\nComponents:");
    println!("  Downloaders: {}", config.components.downloaders);
    println!("  Analyzers: {}", config.components.analyzers);
    println!(
        "  Pipelines: {} (fail fast: {})",
        config.components.pipelines, config.components.fail_fast
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Image directory: {}", config.output.dir);

    let settings = MonitorSettings::from(&config.monitor);
    println!("\nMonitor:");
    println!("  Check interval: {:?}", settings.check_interval);
    println!("  Summarize interval: {:?}", settings.summarize_interval);
    println!("  Max idle count: {}", settings.max_idle_count);
    println!("  Auto stop: {}", settings.auto_stop);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let factory = ComponentFactory::new(config.user_agent.clone(), &config.output.dir);
    let module_args = factory
        .module_args(&config.components)
        .context("failed to create components")?;

    let scheduler = Arc::new(Scheduler::new());
    scheduler
        .init(config.request.clone(), config.data, module_args)
        .context("failed to initialize the scheduler")?;

    let settings = MonitorSettings::from(&config.monitor);
    let mut monitor = spawn_monitor(Arc::clone(&scheduler), settings);

    let first_url = Url::parse(&config.first_url)
        .with_context(|| format!("invalid first URL {}", config.first_url))?;
    scheduler
        .start(reqwest::Request::new(Method::GET, first_url))
        .context("failed to start the scheduler")?;

    tokio::select! {
        checks = &mut monitor => {
            let checks = checks.context("monitor task failed")?;
            tracing::info!("Crawl finished after {} idle checks", checks);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping the scheduler");
            monitor.abort();
            if let Err(e) = scheduler.stop() {
                tracing::warn!("Couldn't stop the scheduler: {}", e);
            }
        }
    }

    tracing::info!("Final summary:\n{}", scheduler.summary());
    Ok(())
}
