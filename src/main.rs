//! SwiftWallet server binary
//!
//! Wires the ledger store, oracle, routing and engine together, then serves
//! the HTTP API and metrics endpoints until shutdown.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use swiftwallet::api;
use swiftwallet::chain::SimulatedSubmitter;
use swiftwallet::config::Settings;
use swiftwallet::engine::TransactionEngine;
use swiftwallet::ledger::LedgerStore;
use swiftwallet::metrics::{self, MetricsServer};
use swiftwallet::oracle::GasPriceOracle;
use swiftwallet::routing::{BridgeCosts, BridgeRouter, ChainSelector};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting SwiftWallet v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    info!(
        "Loaded configuration for instance {}",
        settings.service.instance_id
    );

    let ledger = Arc::new(LedgerStore::new(&settings.database).await?);
    info!("Database connection established");

    ledger.run_migrations().await?;

    if settings.database.seed_demo_data {
        ledger.seed_demo_data().await?;
    }

    let oracle = GasPriceOracle::new();
    let selector = ChainSelector::new(ledger.clone(), oracle.clone());
    let router = BridgeRouter::new(ledger.clone(), BridgeCosts::defaults());
    let engine = Arc::new(TransactionEngine::new(
        ledger.clone(),
        selector.clone(),
        router,
        oracle.clone(),
        Arc::new(SimulatedSubmitter),
    ));
    info!("Transaction engine initialized");

    let metrics_server = if settings.metrics.enabled {
        Some(MetricsServer::new(settings.metrics.port))
    } else {
        None
    };

    // Start API server
    let api_handle = tokio::spawn({
        let api_config = settings.api.clone();
        let state = api::AppState {
            ledger: ledger.clone(),
            engine: engine.clone(),
            selector,
            oracle,
        };
        async move {
            if let Err(e) = api::run_server(api_config, state).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = metrics_server.map(|server| {
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        })
    });

    // Health check loop
    let health_handle = tokio::spawn({
        let ledger = ledger.clone();
        let interval = settings.service.health_check_interval_secs;
        async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;

                match ledger.health_check().await {
                    Ok(()) => metrics::record_health_check(),
                    Err(e) => {
                        warn!("Database health check failed: {}", e);
                        metrics::record_health_check_failure();
                    }
                }
            }
        }
    });

    info!("SwiftWallet is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    api_handle.abort();
    health_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("SwiftWallet stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,swiftwallet=debug,sqlx=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
