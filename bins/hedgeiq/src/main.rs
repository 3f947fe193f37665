//! HedgeIQ binary
//!
//! Entry point for the flow pipeline: streams option trades, maintains the
//! dealer inventory and publishes gamma exposure to the state store.

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{generate_default_config, load_config, save_config, validate_config, HedgeConfig};
use feed::{FeedClient, FeedSettings, FlowProcessor, ProcessorParts, WsConnector};
use gex_engine::{render_report, EngineParams, GexEngine, RecalcScheduler};
use market_data::{DeribitRestClient, InstrumentSnapshotProvider, SnapshotSettings};
use observability::{init_logging, init_metrics, ExposureMetrics, FeedMetrics, LogFormat};
use std::path::Path;
use storage::{
    connect_store, create_store_from_config, DealerInventory, ResultStore, StoreStats, StoreType,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let format = LogFormat::parse(cli.log_format.as_str()).unwrap_or_default();
    init_logging("hedgeiq", format)?;
    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Commands::Start { config } => {
            info!("Executing 'start' command");
            start_command(config).await
        }
        Commands::Validate { config } => validate_command(config).await,
        Commands::Init { output } => init_command(output).await,
        Commands::Status { config } => status_command(config).await,
        Commands::Reset { config, yes } => reset_command(config, yes).await,
    }
}

/// Load the config and refuse to continue if it has errors.
fn load_checked<P: AsRef<Path>>(config_path: P) -> Result<HedgeConfig> {
    let config_path = config_path.as_ref();
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    let report = validate_config(&config);

    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start due to configuration errors");
    }

    Ok(config)
}

async fn start_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = load_checked(config_path)?;
    let asset = config.venue.asset.clone();

    if config.metrics.enabled {
        init_metrics(config.metrics.port)?;
    }

    let store = create_store_from_config(&config.store).await;
    info!(backend = %store.backend(), asset = %asset, "State store ready");

    let venue = DeribitRestClient::new(config.venue.rest_url.clone(), config.venue.request_timeout())
        .context("Failed to build venue client")?;
    let feed_metrics = FeedMetrics::new(&asset);

    let mut processor = FlowProcessor::new(ProcessorParts {
        inventory: DealerInventory::new(store.clone()),
        results: ResultStore::new(store),
        snapshots: InstrumentSnapshotProvider::new(
            venue,
            SnapshotSettings::from_config(&config.venue, &config.snapshot),
        ),
        engine: GexEngine::new(EngineParams::from(&config.engine)),
        scheduler: RecalcScheduler::from_config(&config.scheduler),
        summary_interval: config.feed.summary_interval(),
        feed_metrics: feed_metrics.clone(),
        exposure_metrics: ExposureMetrics::new(&asset),
    });
    processor.prime().await;

    let mut client = FeedClient::new(
        WsConnector,
        FeedSettings::from_config(&config.venue, &config.feed),
        feed_metrics,
    );

    let stop = CancellationToken::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received, stopping after the current read"),
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
            stop.cancel();
        });
    }

    client
        .run_forever(&mut processor, stop)
        .await
        .context("Trade feed stopped")?;

    info!(trades = processor.trades_total(), "HedgeIQ stopped");
    Ok(())
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Asset: {} (index {})", config.venue.asset, config.venue.index_name);
    println!("Feed: {}", config.venue.ws_url);
    println!("Store: {}", config.store.backend);
    println!(
        "Recalculation: every {} trades or {}s",
        config.scheduler.recalc_every_n_trades, config.scheduler.recalc_interval_seconds
    );

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Set DERIBIT_CLIENT_ID, DERIBIT_CLIENT_SECRET and REDIS_URL");
    println!(
        "  2. Run 'hedgeiq validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'hedgeiq start --config {:?}' to start streaming",
        output_path
    );

    Ok(())
}

async fn status_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = load_checked(config_path)?;
    let store = connect_store(&config.store)
        .await
        .with_context(|| format!("Failed to connect to {} store", config.store.backend))?;
    let backend = store.backend();
    let inventory = DealerInventory::new(store.clone());
    let results = ResultStore::new(store);

    let stats = StoreStats::collect(backend, &inventory, &results)
        .await
        .context("Failed to read store statistics")?;

    println!("\n=== HedgeIQ Store Status ===\n");
    println!("Backend: {}", stats.backend);
    if stats.backend == StoreType::InMemory {
        println!("  (in-memory store is local to this process; nothing is shared)");
    }
    println!("Strikes tracked: {}", stats.strikes_tracked);
    println!("Total position size: {:.1}", stats.total_position_size);
    println!("Spot price: {}", fmt_opt(stats.spot_price));
    println!("Flip level: {}", fmt_opt(stats.flip_level));
    println!(
        "Last GEX update: {}",
        stats
            .last_gex_update
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    println!();

    match results.latest().await.context("Failed to read exposure result")? {
        Some(result) => println!("{}", render_report(&result)),
        None => println!("No exposure result published yet"),
    }

    Ok(())
}

async fn reset_command<P: AsRef<Path>>(config_path: P, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!("Refusing to reset dealer inventory without --yes");
    }

    let config = load_checked(config_path)?;
    let store = connect_store(&config.store)
        .await
        .with_context(|| format!("Failed to connect to {} store", config.store.backend))?;
    let inventory = DealerInventory::new(store.clone());
    let before = inventory
        .snapshot()
        .await
        .context("Failed to read dealer inventory")?;

    inventory
        .reset()
        .await
        .context("Failed to reset dealer inventory")?;

    println!(
        "[ok] Dealer inventory reset ({} positions removed from {} store)",
        before.len(),
        store.backend()
    );
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "n/a".to_string())
}
