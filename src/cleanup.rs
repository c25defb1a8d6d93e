//! ==============================================================================
//! cleanup.rs - periodic record pruning
//! ==============================================================================
//!
//! purpose:
//!     background task that trims the record store back to max_records,
//!     oldest first, on a fixed period. ingestion never prunes inline, so the
//!     store can run over the bound for up to one period.
//!
//! lifecycle:
//!     spawned by main.rs when system.auto_cleanup is on. stops when the
//!     shutdown watch channel flips to true (or its sender is dropped).
//!
//! relationships:
//!     - uses: store.rs (TelemetryStore::prune)
//!
//! ==============================================================================

use crate::store::TelemetryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub fn spawn_cleanup(
    store: Arc<TelemetryStore>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(period_secs = period.as_secs_f64(), max_records = store.max_records(), "Cleanup task started");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.prune().await;
                    if removed > 0 {
                        tracing::info!(removed, "Pruned old sensor records");
                    } else {
                        tracing::trace!("Nothing to prune");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Cleanup task stopped");
    })
}
