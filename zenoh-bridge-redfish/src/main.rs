//! Zenoh bridge for Redfish management endpoints.
//!
//! Polls Redfish services on a fixed interval and publishes the extracted
//! samples to Zenoh.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use zenoh_bridge_redfish::{
    BridgeStatus, Collector, HttpTransport, RedfishBridgeConfig, RedfishPlugin, TypesDb,
    ZenohDispatcher,
};

/// Zenoh bridge for Redfish (BMC hardware telemetry).
#[derive(Parser, Debug)]
#[command(name = "zenoh-bridge-redfish")]
#[command(about = "Polls Redfish services and publishes samples to Zenoh")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "redfish.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single collection cycle and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = RedfishBridgeConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = config.logging.with_level_override(args.log_level.as_deref());
    redfish_common::init_tracing(&log_config).context("Failed to init tracing")?;

    info!("Starting zenoh-bridge-redfish");
    info!(config = ?args.config, "Loaded configuration");

    // Connect to Zenoh
    let session = Arc::new(
        redfish_common::connect(&config.zenoh)
            .await
            .context("Failed to connect to Zenoh")?,
    );

    let dispatcher = ZenohDispatcher::new(
        session.clone(),
        &config.redfish.key_prefix,
        config.serialization,
    );
    let transport = HttpTransport::new(
        Duration::from_millis(config.redfish.timeout_ms),
        config.redfish.accept_invalid_certs,
    )
    .context("Failed to create HTTP client")?;

    let mut plugin = RedfishPlugin::new(
        config.redfish.blocks.clone(),
        TypesDb::with_overrides(&config.redfish.types),
        transport,
        dispatcher.clone(),
    );
    if let Err(e) = plugin.init() {
        error!("Failed to load Redfish configuration: {}", e);
        if let Err(publish_err) = dispatcher
            .publish_status(&BridgeStatus::error(e.to_string()))
            .await
        {
            error!("Failed to publish bridge status: {}", publish_err);
        }
        close(&session).await?;
        return Err(anyhow::Error::new(e).context("Failed to load Redfish configuration"));
    }

    let services: Vec<String> = plugin
        .registry()
        .map(|r| r.services().iter().map(|s| s.name.clone()).collect())
        .unwrap_or_default();
    if services.is_empty() {
        warn!("No Redfish service configured");
    }

    if args.once {
        let stats = plugin.collect_once().await;
        info!(
            queries_run = stats.queries_run,
            queries_failed = stats.queries_failed,
            dispatched = stats.samples_dispatched,
            skipped = stats.samples_skipped,
            "Single collection cycle complete"
        );
        plugin.shutdown();
        close(&session).await?;
        return Ok(());
    }

    // Publish bridge status
    if let Err(e) = dispatcher
        .publish_status(&BridgeStatus::running(services.clone()))
        .await
    {
        error!("Failed to publish bridge status: {}", e);
    }

    info!(
        services = services.len(),
        interval_secs = config.redfish.poll_interval_secs,
        "Redfish bridge running"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.redfish.poll_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stats = plugin.collect_once().await;
                if stats.queries_failed > 0 || stats.dispatch_failed > 0 {
                    warn!(
                        queries_failed = stats.queries_failed,
                        dispatch_failed = stats.dispatch_failed,
                        "Collection cycle finished with errors"
                    );
                }
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Received shutdown signal");
                break;
            }
        }
    }

    plugin.shutdown();

    // Publish offline status
    if let Err(e) = dispatcher.publish_status(&BridgeStatus::offline()).await {
        error!("Failed to publish offline status: {}", e);
    }

    close(&session).await?;
    info!("Redfish bridge stopped");

    Ok(())
}

async fn close(session: &zenoh::Session) -> Result<()> {
    session
        .close()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to close Zenoh session: {}", e))
}
