//! fxgap CLI and server binary
//!
//! Entry point for the rate gap monitor. Provides commands for running the
//! service, doing a one-shot fetch, and managing configuration.

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{generate_default_config, load_config, save_config, validate_config, MonitorConfig};
use observability::{init_logging, LogFormat};
use rates::api::{create_router, ApiState};
use rates::clock::SystemClock;
use rates::{
    FileSnapshotStore, HttpOfficialRateSource, HttpPeerMarketSource, PeerMarketEndpoint,
    RateMonitor, RefreshWorker,
};
use server::{HttpServer, ShutdownController};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Serve { config, http } => serve(config, http).await,
        Commands::Fetch { config, force } => fetch(config, force).await,
        Commands::Validate { config } => validate_command(config).await,
        Commands::Init { output } => init_command(output).await,
    }
}

/// Load a configuration file and fail on validation errors.
///
/// Runs before logging is initialized (the log format itself comes from the
/// config), so findings go to stderr directly.
fn load_and_check<P: AsRef<Path>>(config_path: P) -> Result<MonitorConfig> {
    let config = load_config(&config_path)?;
    let report = validate_config(&config);

    for warning in &report.warnings {
        eprintln!("[warn] [{}] {}", warning.field, warning.message);
    }

    if !report.is_valid() {
        for err in &report.errors {
            eprintln!("[error] {}", err);
        }
        anyhow::bail!("Cannot start due to configuration errors");
    }

    Ok(config)
}

fn build_monitor(config: &MonitorConfig) -> RateMonitor {
    let official = Arc::new(HttpOfficialRateSource::new(
        config.official_source.url.clone(),
        Duration::from_secs(config.official_source.timeout_seconds),
    ));
    let peer = Arc::new(HttpPeerMarketSource::new(PeerMarketEndpoint {
        url: config.peer_source.url.clone(),
        fiat: config.peer_source.fiat.clone(),
        asset: config.peer_source.asset.clone(),
        rows: config.peer_source.rows,
        timeout: Duration::from_secs(config.peer_source.timeout_seconds),
    }));
    let store = Arc::new(FileSnapshotStore::new(config.storage.snapshot_path.clone()));

    RateMonitor::with_settings(
        official,
        peer,
        store,
        Arc::new(SystemClock),
        config.monitor.refresh_ttl_minutes,
        config.monitor.reference_amount,
    )
}

async fn serve(config_path: PathBuf, http_override: Option<u16>) -> Result<()> {
    let config = load_and_check(&config_path)?;

    let format = LogFormat::parse(&config.server.log_format).unwrap_or_default();
    init_logging(&config.monitor.name, format)?;

    info!(config = %config_path.display(), "fxgap starting");

    if let Some(port) = config.server.metrics_port {
        observability::init_metrics(port).context("Failed to start metrics exporter")?;
    }

    let monitor = build_monitor(&config);

    // Storage problems never block startup; the monitor just starts cold.
    match monitor.restore().await {
        Ok(true) => info!("Previous snapshot restored from disk"),
        Ok(false) => info!("No previous snapshot found, starting cold"),
        Err(error) => warn!(%error, "Snapshot restore failed, starting cold"),
    }

    let shutdown = ShutdownController::with_ctrl_c();

    let worker = RefreshWorker::new(
        monitor.clone(),
        Duration::from_secs(config.monitor.refresh_ttl_minutes * 60),
    );
    let worker_handle = {
        let token = shutdown.child_token();
        tokio::spawn(async move { worker.run(token).await })
    };

    let router = create_router(ApiState {
        monitor,
        service_name: config.monitor.name.clone(),
    });

    let http_port = http_override.unwrap_or(config.server.http_port);
    let http = HttpServer::new(config.server.host.clone(), http_port, router);

    http.run(shutdown.child_token()).await?;

    worker_handle.await.context("Refresh worker panicked")?;
    info!("fxgap stopped");
    Ok(())
}

async fn fetch(config_path: PathBuf, force: bool) -> Result<()> {
    let config = load_and_check(&config_path)?;
    init_logging(&config.monitor.name, LogFormat::Compact)?;

    let monitor = build_monitor(&config);
    if let Err(error) = monitor.restore().await {
        warn!(%error, "Snapshot restore failed, fetching fresh");
    }

    let report = if force {
        monitor.force_refresh().await
    } else {
        monitor.current().await
    }
    .context("Refresh failed with no cached snapshot available")?;

    let output = serde_json::json!({
        "served_from": report.served_from,
        "refreshed_at": report.refreshed_at,
        "warning": report.warning.as_ref().map(|e| e.to_string()),
        "snapshot": report.snapshot,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

async fn validate_command(config_path: PathBuf) -> Result<()> {
    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[error] Failed to load configuration: {}", e);
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
    println!("Monitor: {}", config.monitor.name);
    println!(
        "Pair: {}/{}",
        config.peer_source.asset, config.peer_source.fiat
    );
    println!("Refresh TTL: {} minutes", config.monitor.refresh_ttl_minutes);
    println!("Snapshot file: {}", config.storage.snapshot_path);

    Ok(())
}

async fn init_command(output_path: PathBuf) -> Result<()> {
    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    save_config(&config, &output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Edit the file to point at your rate providers");
    println!(
        "  2. Run 'fxgap validate --config {:?}' to check the configuration",
        output_path
    );
    println!(
        "  3. Run 'fxgap serve --config {:?}' to start the monitor",
        output_path
    );

    Ok(())
}
