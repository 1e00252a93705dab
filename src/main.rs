//! doc-harvest main entry point
//!
//! This is the command-line interface for the doc-harvest documentation crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use doc_harvest::config::{load_config_with_hash, Config};
use doc_harvest::{
    CrawlMode, DiscoverRequest, DocumentationLookup, Harvester, ProgressEvent, StartRequest,
    TaskStatus,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// doc-harvest: framework documentation discovery and crawling
///
/// Finds the official documentation of a framework and crawls it politely,
/// storing cleaned page text as JSON.
#[derive(Parser, Debug)]
#[command(name = "doc-harvest")]
#[command(version)]
#[command(about = "Framework documentation discovery and crawling", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Validate config and show what would be done without any network access
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up the official documentation site of a framework
    Search {
        /// Framework name, e.g. "react"
        framework: String,
    },

    /// List the documentation topics linked from a landing page
    Topics {
        /// Framework name, e.g. "react"
        framework: String,

        /// Documentation landing page
        #[arg(long)]
        url: String,
    },

    /// Crawl the documentation of a framework
    Crawl {
        /// Framework name, e.g. "react"
        framework: String,

        /// Seed URL; looked up with the search strategies when omitted
        #[arg(long)]
        url: Option<String>,

        /// Crawl mode: "intelligent" or "basic"
        #[arg(long, default_value = "intelligent")]
        mode: CrawlMode,

        /// Topic the intelligent planner focuses on (defaults to the framework)
        #[arg(long)]
        topic: Option<String>,

        /// Task identifier (a UUID is generated when omitted)
        #[arg(long)]
        task_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.command);
        return Ok(());
    }

    let harvester = Harvester::from_config(&config).context("failed to build harvester")?;

    match cli.command {
        Command::Search { framework } => handle_search(&harvester, &framework).await,
        Command::Topics { framework, url } => handle_topics(&harvester, framework, url).await,
        Command::Crawl {
            framework,
            url,
            mode,
            topic,
            task_id,
        } => {
            let mode = match mode {
                CrawlMode::Intelligent { .. } => CrawlMode::Intelligent { topic },
                CrawlMode::Basic => CrawlMode::Basic,
            };
            handle_crawl(&harvester, framework, url, mode, task_id).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("doc_harvest=info,warn"),
            1 => EnvFilter::new("doc_harvest=debug,info"),
            2 => EnvFilter::new("doc_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective config and the planned action
fn handle_dry_run(config: &Config, command: &Command) {
    println!("=== doc-harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Rate limit: {}ms", config.crawler.rate_limit_ms);
    println!("  Content limit: {} chars", config.crawler.content_limit);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nResilience:");
    println!("  Environment: {:?}", config.resilience.environment);
    println!("  Max retries: {}", config.resilience.max_retries);
    println!("  Fetch timeout: {:?}", config.resilience.fetch_timeout());
    println!(
        "  Completion timeout: {:?}",
        config.resilience.completion_timeout()
    );
    println!(
        "  Circuit breaker: {} failures, reset after {:?}",
        config.circuit_breaker.failure_threshold,
        config.circuit_breaker.reset_timeout()
    );

    println!("\nCompletion service:");
    println!("  Endpoint: {}", config.completion.endpoint);
    println!("  Model: {}", config.completion.model);
    println!("  API key variable: {}", config.completion.api_key_env);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);

    println!("\nAction:");
    match command {
        Command::Search { framework } => println!("  Search documentation for {}", framework),
        Command::Topics { framework, url } => {
            println!("  Discover {} topics from {}", framework, url)
        }
        Command::Crawl {
            framework,
            url,
            mode,
            ..
        } => match url {
            Some(url) => println!("  {} crawl of {} for {}", mode, url, framework),
            None => println!(
                "  Search documentation for {}, then {} crawl",
                framework, mode
            ),
        },
    }

    println!("\n=== Dry run complete. No network access performed. ===");
}

async fn handle_search(harvester: &Harvester, framework: &str) -> anyhow::Result<()> {
    let lookup = harvester.find_documentation(framework).await;
    println!("{}", serde_json::to_string_pretty(&lookup)?);

    if matches!(lookup, DocumentationLookup::NotFound { .. }) {
        bail!("no documentation found for {}", framework);
    }
    Ok(())
}

async fn handle_topics(
    harvester: &Harvester,
    framework: String,
    url: String,
) -> anyhow::Result<()> {
    let discovery = harvester
        .discover_topics(DiscoverRequest {
            task_id: None,
            url,
            framework,
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&discovery)?);
    Ok(())
}

async fn handle_crawl(
    harvester: &Harvester,
    framework: String,
    url: Option<String>,
    mode: CrawlMode,
    task_id: Option<String>,
) -> anyhow::Result<()> {
    let seed_url = match url {
        Some(url) => url,
        None => match harvester.find_documentation(&framework).await {
            DocumentationLookup::Found { official_docs, .. } => {
                tracing::info!("Using {} as seed for {}", official_docs, framework);
                official_docs
            }
            DocumentationLookup::NotFound { error, suggestions, .. } => {
                if !suggestions.is_empty() {
                    eprintln!("Did you mean: {}?", suggestions.join(", "));
                }
                bail!("{}: {}", framework, error);
            }
        },
    };

    // Subscribe before the run starts so no update is missed
    let task_id = task_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut subscription = harvester.subscribe_progress(&task_id);

    let task = harvester.start_crawl(StartRequest {
        task_id: Some(task_id),
        seed_url,
        framework,
        mode,
    })?;
    println!("Started task {} ({} crawl of {})", task.id, task.mode, task.seed_url);

    while let Some(event) = subscription.recv().await {
        match event {
            ProgressEvent::TaskUpdate(update) => {
                println!("[{:>5.1}%] {}", update.progress, update.message);
                if update.status.is_terminal() {
                    break;
                }
            }
            ProgressEvent::Removed { .. } => break,
        }
    }
    harvester.unsubscribe(&subscription);

    let task = harvester.get_task(&task.id)?;
    match task.status {
        TaskStatus::Completed => {
            println!(
                "Done: {} pages scraped",
                task.pages_scraped.unwrap_or_default()
            );
            Ok(())
        }
        status => bail!(
            "task {} ended as {}: {}",
            task.id,
            status,
            task.error.unwrap_or_default()
        ),
    }
}
