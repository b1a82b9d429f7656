//! OAI-Seed main entry point
//!
//! This is the command-line interface for harvesting crawl seeds from an
//! OAI-PMH repository.

use anyhow::{bail, Context};
use clap::Parser;
use oai_seed::config::{load_config_with_hash, Config};
use oai_seed::consume::{consume_normally, FetchedContent, RedirectNormalizer};
use oai_seed::harvest::{HarvestSession, HarvesterProfile, OaiCrawlSeed};
use oai_seed::output::{load_manifest, print_report, print_run};
use oai_seed::protocol::{FetchFlags, Fetcher, HttpFetcher};
use oai_seed::storage::{open_store, RunLog, RunStatus, SqliteContentStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// OAI-Seed: crawl seeds from OAI-PMH repositories
///
/// Walks a repository's ListRecords result, keeps the records matching the
/// configured year, maps them to content URLs and stores the start-URL
/// manifest for the crawl.
#[derive(Parser, Debug)]
#[command(name = "oai-seed")]
#[command(version = "1.0.0")]
#[command(about = "Crawl seeds from OAI-PMH repositories", long_about = None)]
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

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with_all = ["identify", "show_manifest", "consume"])]
    dry_run: bool,

    /// Ask the repository to identify itself and exit
    #[arg(long, conflicts_with_all = ["dry_run", "show_manifest", "consume"])]
    identify: bool,

    /// Print the manifest of the latest harvest and exit
    #[arg(long, conflicts_with_all = ["dry_run", "identify", "consume"])]
    show_manifest: bool,

    /// Fetch one URL through the redirect normalizer and store it
    #[arg(long, value_name = "URL", conflicts_with_all = ["dry_run", "identify", "show_manifest"])]
    consume: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).context(format!("loading {}", cli.config.display()));
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.identify {
        handle_identify(&config).await?;
    } else if cli.show_manifest {
        handle_show_manifest(&config)?;
    } else if let Some(url) = &cli.consume {
        handle_consume(&config, url).await?;
    } else {
        handle_harvest(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("oai_seed=info,warn"),
            1 => EnvFilter::new("oai_seed=debug,info"),
            2 => EnvFilter::new("oai_seed=trace,debug"),
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

fn open_database(config: &Config) -> anyhow::Result<SqliteContentStore> {
    let path = Path::new(&config.output.database_path);
    open_store(path).with_context(|| format!("opening database {}", path.display()))
}

fn http_fetcher(config: &Config) -> anyhow::Result<Arc<HttpFetcher>> {
    let fetcher = HttpFetcher::from_config(&config.user_agent).context("building HTTP client")?;
    Ok(Arc::new(fetcher))
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let profile = HarvesterProfile::from_config(&config.profile)?;
    let session = HarvestSession::from_config(&config.session, &profile)?;

    println!("=== OAI-Seed Dry Run ===\n");

    println!("Session:");
    println!("  Base URL: {}", session.base_url);
    println!("  Endpoint: {}", session.endpoint);
    println!("  Metadata prefix: {}", session.metadata_prefix);
    if let Some(set) = &session.set_spec {
        println!("  Set: {}", set);
    }
    match &session.filter_rule {
        Some(rule) => println!(
            "  Year: {:04} (tag {}, {:?})",
            rule.year, rule.tag_path, rule.mode
        ),
        None => println!("  Year: any"),
    }
    if let Some(from) = &session.date_range.from {
        println!("  From: {}", from);
    }
    if let Some(until) = &session.date_range.until {
        println!("  Until: {}", until);
    }
    println!("  Fail on empty: {}", session.fail_on_empty);

    println!("\nProfile: {}", profile.name);
    println!("  Identifier tag: {}", profile.identifier_path);
    if let Some(domain) = &profile.handle_domain {
        println!("  Handle domain: {}", domain);
    }
    println!("  Proxy marker: {}", profile.proxy_marker);
    println!("  Fallback URL: {}", profile.fallback_url(&session));
    if let Some(rule) = &profile.crawl_rule {
        println!("  Crawl rule: {}", rule);
    }

    println!("\nRetry:");
    println!("  Network retries: {}", config.retry.network_retries);
    println!("  Same-URL retries: {}", config.retry.same_url_retries);
    println!("  Wait: {}ms", config.retry.wait_ms);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nPermission URLs ({}):", session.permission_urls.len());
    for url in &session.permission_urls {
        println!("  - {}", url);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
    println!("✓ Would request {}", session.origin_url());

    Ok(())
}

/// Handles the --identify mode
async fn handle_identify(config: &Config) -> anyhow::Result<()> {
    let seed = OaiCrawlSeed::from_config(
        config,
        http_fetcher(config)?,
        SqliteContentStore::open_in_memory()?,
    )?;

    let identity = seed.client().identify().await?;
    println!("Repository: {}", identity.repository_name);
    println!("  Base URL: {}", identity.base_url);
    println!("  Protocol version: {}", identity.protocol_version);
    println!("  Earliest datestamp: {}", identity.earliest_datestamp);
    println!("  Granularity: {}", identity.granularity);

    Ok(())
}

/// Handles the --show-manifest mode: prints the latest run and its start URLs
fn handle_show_manifest(config: &Config) -> anyhow::Result<()> {
    let store = open_database(config)?;

    let Some(run) = store.get_latest_run()? else {
        bail!("No harvest runs found in {}", config.output.database_path);
    };
    print_run(&run);

    let key = run.manifest_key.as_deref().unwrap_or(&run.origin_url);
    match load_manifest(&store, key)? {
        Some(urls) => {
            println!("\nStart URLs ({}):", urls.len());
            for url in urls {
                println!("  {}", url);
            }
        }
        None => println!("\nNo manifest stored for {}", key),
    }

    Ok(())
}

/// Handles the --consume mode
async fn handle_consume(config: &Config, url: &str) -> anyhow::Result<()> {
    let fetcher = http_fetcher(config)?;
    let profile = HarvesterProfile::from_config(&config.profile)?;
    let mut store = open_database(config)?;

    let resource = fetcher
        .fetch(url, FetchFlags::default())
        .await
        .with_context(|| format!("fetching {}", url))?;
    let content = FetchedContent::read(resource)
        .await
        .with_context(|| format!("reading {}", url))?;

    let outcome = match RedirectNormalizer::for_profile(&profile) {
        Some(normalizer) => normalizer.consume(&content, &mut store)?,
        None => consume_normally(&content, &mut store)?,
    };

    println!("Stored {} bytes as {}", content.body.len(), outcome.content_key());
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let fetcher = http_fetcher(&config)?;
    let store = open_database(&config)?;
    let mut seed = OaiCrawlSeed::from_config(&config, fetcher, store)?;

    let origin = seed.session().origin_url();
    let run_id = seed.store_mut().create_run(config_hash, &origin)?;

    match seed.harvest().await {
        Ok(outcome) => {
            let status = if outcome.report.degraded {
                RunStatus::Degraded
            } else {
                RunStatus::Completed
            };
            seed.store_mut().finish_run(
                run_id,
                status,
                outcome.report.start_urls,
                outcome.report.manifest_key.as_deref(),
            )?;

            for url in &outcome.start_urls {
                println!("{}", url);
            }
            println!();
            print_report(&outcome.report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            seed.store_mut()
                .finish_run(run_id, RunStatus::Failed, 0, None)?;
            Err(e.into())
        }
    }
}
