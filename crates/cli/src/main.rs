mod metrics;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fontindex_core::{
    load_config, load_config_from_env, validate_config, Config, FontIndexService, RefreshOptions,
    SanitizedConfig, SearchOptions,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(
    name = "fontindex",
    version,
    about = "Local mirror and search for the Adobe Fonts catalog"
)]
struct Cli {
    /// Configuration file; defaults plus environment when absent.
    #[arg(long, env = "FONTINDEX_CONFIG", default_value = "fontindex.toml")]
    config: PathBuf,

    /// Override the index database path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print Prometheus metrics to stderr after the command.
    #[arg(long, global = true, default_value_t = false)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh the local index from the catalog.
    Refresh(RefreshArgs),
    /// Show whether the index exists and how fresh it is.
    Status,
    /// Show index statistics.
    Stats {
        /// Entries per top-N list.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Search the index, or the live catalog without one.
    Search(SearchArgs),
    /// Show one family from the index.
    Get {
        /// Family id.
        id: String,
    },
    /// Print the effective configuration (token redacted).
    Config,
}

#[derive(Args, Debug)]
struct RefreshArgs {
    /// Library to refresh instead of the automatic choice.
    #[arg(long)]
    library: Option<String>,

    /// Families per listing page.
    #[arg(long)]
    page_size: Option<u32>,

    /// Listing pages to read per library.
    #[arg(long)]
    max_pages: Option<u32>,

    /// Concurrent detail fetches.
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search text.
    query: String,

    /// Only families whose classification contains this value.
    #[arg(long)]
    classification: Option<String>,

    /// Only families supporting this language code.
    #[arg(long)]
    language: Option<String>,

    /// Maximum results.
    #[arg(long)]
    limit: Option<usize>,

    /// Never contact the catalog.
    #[arg(long, default_value_t = false, conflicts_with = "no_cache")]
    cache_only: bool,

    /// Ignore the local index and scan the catalog.
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Refresh the index before searching.
    #[arg(long, default_value_t = false)]
    refresh: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Logs go to stderr; stdout carries only JSON results.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = read_config(&cli.config)?;
    if let Some(db) = &cli.db {
        config.index.path = db.clone();
    }
    validate_config(&config).context("Configuration validation failed")?;

    info!(version = VERSION, path = ?config.index.path, "Configuration loaded");

    let config = Arc::new(config);
    let service =
        FontIndexService::from_config(Arc::clone(&config)).context("Failed to create service")?;

    match cli.command {
        Command::Refresh(args) => {
            let options = refresh_options(&service, args);
            let result = service.refresh(&options).await.context("Refresh failed")?;
            print_json(&result)?;
        }
        Command::Status => {
            let status = service.status().context("Failed to read index status")?;
            print_json(&status)?;
        }
        Command::Stats { limit } => {
            let stats = service.stats(limit).context("Failed to read index stats")?;
            print_json(&stats)?;
        }
        Command::Search(args) => {
            let options = SearchOptions {
                classification: args.classification,
                language: args.language,
                limit: args.limit,
                cache_only: args.cache_only,
                no_cache: args.no_cache,
                refresh_first: args.refresh,
            };
            let response = service
                .search(&args.query, &options)
                .await
                .with_context(|| format!("Search for '{}' failed", args.query))?;
            print_json(&response)?;
        }
        Command::Get { id } => {
            let family = service
                .get(&id)
                .with_context(|| format!("Failed to read family {}", id))?;
            print_json(&family)?;
        }
        Command::Config => {
            print_json(&SanitizedConfig::from(config.as_ref()))?;
        }
    }

    if cli.metrics {
        metrics::collect_dynamic_metrics(&service);
        eprint!("{}", metrics::encode_metrics());
    }

    Ok(())
}

/// Load the config file, or defaults plus environment when it is absent.
fn read_config(path: &Path) -> Result<Config> {
    if path.exists() {
        info!("Loading configuration from {:?}", path);
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
    } else {
        info!("No config file at {:?}; using defaults and environment", path);
        load_config_from_env().context("Failed to load config from environment")
    }
}

fn refresh_options(service: &FontIndexService, args: RefreshArgs) -> RefreshOptions {
    let defaults = service.default_refresh_options();
    RefreshOptions {
        library: args.library.or(defaults.library),
        page_size: args.page_size.unwrap_or(defaults.page_size),
        max_pages: args.max_pages.unwrap_or(defaults.max_pages),
        concurrency: args.concurrency.unwrap_or(defaults.concurrency),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", json);
    Ok(())
}
