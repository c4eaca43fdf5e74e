//! Torrent Index CLI
//!
//! Runs the index server, or a one-off scrape for checking selectors.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::watch;

use torrent_index::{
    error::{AppError, Result},
    models::Config,
    query::QueryService,
    scheduler::{IntervalTicker, RefreshScheduler},
    server::{self, AppState},
    services::{ListingScraper, Scraper},
    store::IndexStore,
};

/// torrent-index - Top torrents per category, rebuilt periodically
#[derive(Parser, Debug)]
#[command(
    name = "torrent-index",
    version,
    about = "Serves a periodically rebuilt torrent index"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the index on a timer and serve it over HTTP (default)
    Serve,

    /// Scrape once and print the resulting index as JSON
    Scrape,

    /// Validate configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();
    log::info!("Loaded configuration from {}", cli.config.display());

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    let config = Arc::new(config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await?,

        Command::Scrape => {
            let scraper = ListingScraper::new(Arc::clone(&config))?;
            let index = scraper.scrape().await?;
            log::info!(
                "Scraped {} categories with {} torrents",
                index.len(),
                index.item_count()
            );
            println!("{}", serde_json::to_string_pretty(&index)?);
        }

        Command::Validate => {
            log::info!(
                "✓ Config OK ({} categories, refresh every {}s)",
                config.categories.len(),
                config.refresh.interval_secs
            );
        }
    }

    Ok(())
}

/// Start the refresh scheduler and HTTP server; stop both on Ctrl-C.
async fn run_server(config: Arc<Config>) -> Result<()> {
    let scraper = Arc::new(ListingScraper::new(Arc::clone(&config))?);
    let store = Arc::new(IndexStore::new());
    let scheduler = Arc::new(RefreshScheduler::new(scraper, Arc::clone(&store)));
    let queries = QueryService::new(Arc::clone(&store));

    let (stop_tx, stop_rx) = watch::channel(false);

    let ticker = IntervalTicker::new(config.refresh.interval());
    let scheduler_task = tokio::spawn(
        Arc::clone(&scheduler).run(ticker, wait_for_stop(stop_rx.clone())),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::config(format!("Cannot listen on {addr}: {e}")))?;
    let state = AppState::new(queries, config.server.admin_email.as_str());
    let server_task = tokio::spawn(server::serve(listener, state, wait_for_stop(stop_rx)));

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutting down...");
    let _ = stop_tx.send(true);

    if let Err(e) = scheduler_task.await {
        log::error!("Refresh scheduler task failed: {}", e);
    }
    match server_task.await {
        Ok(result) => result?,
        Err(e) => log::error!("HTTP server task failed: {}", e),
    }

    let stats = scheduler.stats();
    log::info!(
        "Done! {} rebuilds attempted, {} published, {} failed, {} ticks skipped",
        stats.attempts,
        stats.successes,
        stats.failures,
        stats.skipped
    );
    if scheduler.is_refreshing() {
        log::warn!("Abandoning in-flight index rebuild");
    }

    Ok(())
}

async fn wait_for_stop(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}
