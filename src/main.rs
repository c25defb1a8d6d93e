//! ==============================================================================
//! main.rs - telemetry hub entry point
//! ==============================================================================
//!
//! purpose:
//!     receives sensor readings from the esp32 simulator (wokwi), keeps the
//!     recent ones in memory, and lets an operator force sensor values or
//!     flip lights/alarm remotely for testing.
//!
//! responsibilities:
//!     - load configuration (config.rs) and initialise tracing
//!     - build the shared store and serve the http api (api.rs)
//!     - run the periodic cleanup task (cleanup.rs)
//!     - shut both down cleanly on ctrl-c / sigterm
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                   telemetry hub (this file)                 │
//!     │  ┌─────────────────────┐          ┌─────────────────────┐   │
//!     │  │ web server          │          │ cleanup task        │   │
//!     │  │ (port 5000)         │          │ (60s cycle)         │   │
//!     │  └──────────┬──────────┘          └──────────┬──────────┘   │
//!     │             │                                │              │
//!     │             └───────────────┬────────────────┘              │
//!     │                       ┌─────┴─────┐                         │
//!     │                       │   store   │ <- store.rs             │
//!     │                       └───────────┘                         │
//!     │          (Arc-shared records + controls, one lock each)      │
//!     └─────────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

use anyhow::Result;
use std::time::Duration;
use telemetry_hub::{api, cleanup, config::HubConfig};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ENDPOINTS: [(&str, &str); 10] = [
    ("POST /data", "Receive sensor data"),
    ("GET  /data", "Get all sensor data"),
    ("GET  /latest", "Get latest sensor data"),
    ("POST /control/...", "Remote control commands"),
    ("GET  /controls", "Check current control status"),
    ("POST /controls/reset", "Reset all controls"),
    ("GET  /status", "System status"),
    ("POST /data/reset", "Clear all sensor data"),
    ("GET  /health", "Health check"),
    ("GET  /", "Liveness message"),
];

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration (before logging, so the level can come from it)
    let (config, source, warnings) = HubConfig::load_or_default();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("telemetry_hub={},tower_http=info", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // startup banner
    println!("===========================================================");
    println!("  Smart Home IoT Telemetry Hub v{}", env!("CARGO_PKG_VERSION"));
    println!("===========================================================");

    for warning in &warnings {
        tracing::warn!("{}", warning);
    }
    if let Some(path) = &source {
        tracing::info!(path = %path.display(), "Config file loaded");
    }
    config.log_summary();

    // step 2: shared state
    let state = api::AppState::new(config.system.clone(), config.logging.show_sensor_data);

    // step 3: cleanup task, stopped through the watch channel on shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cleanup_handle = if config.system.auto_cleanup {
        Some(cleanup::spawn_cleanup(
            state.store.clone(),
            Duration::from_secs(config.cleanup.interval_seconds),
            shutdown_rx,
        ))
    } else {
        tracing::info!("Auto cleanup disabled; store is not pruned");
        None
    };

    // step 4: web server
    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Listening");
    for (route, purpose) in ENDPOINTS {
        tracing::info!("   {:<22} - {}", route, purpose);
    }

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // step 5: stop background work
    let _ = shutdown_tx.send(true);
    if let Some(handle) = cleanup_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Cleanup task failed");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
