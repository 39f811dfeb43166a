//! Retention sweep
//!
//! Walks the durable store's tracked-host set and purges history entries
//! older than the retention window. Belt-and-suspenders next to the
//! collection-level expiry the scheduler refreshes: the expiry bounds a
//! host that stops reporting, the sweep bounds one that keeps reporting.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{error, info};

use crate::store::TimeSeriesStore;

/// Periodic history purge for the durable store
pub struct RetentionSweeper {
    store: Arc<dyn TimeSeriesStore>,
    sweep_interval: Duration,
    retention_ms: i64,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl RetentionSweeper {
    /// Create a sweeper enforcing `retention_ms` of history
    pub fn new(store: Arc<dyn TimeSeriesStore>, sweep_interval: Duration, retention_ms: i64) -> Self {
        Self {
            store,
            sweep_interval,
            retention_ms,
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Start the periodic sweep task
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.lock() = Some(shutdown_tx);

        let sweeper = Arc::clone(self);
        tokio::spawn(async move {
            info!(interval = ?sweeper.sweep_interval, "Retention sweeper started");
            let mut ticker = interval(sweeper.sweep_interval);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match sweeper.sweep_once().await {
                            Ok(removed) if removed > 0 => {
                                info!(removed, "Retention sweep purged expired samples");
                            }
                            Ok(_) => {}
                            Err(e) => {
                                error!(error = %e, "Retention sweep failed");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Retention sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Signal the periodic task to stop
    pub async fn stop(&self) {
        let tx = self.shutdown_tx.lock().take();
        if let Some(tx) = tx {
            let _ = tx.send(()).await;
        }
    }

    /// Run one sweep across every tracked host; returns total samples removed.
    ///
    /// A per-host purge failure is logged and the sweep continues; only
    /// failure to enumerate hosts aborts the pass.
    pub async fn sweep_once(&self) -> Result<u64, crate::store::StoreError> {
        let cutoff = Utc::now().timestamp_millis() - self.retention_ms;
        let hosts = self.store.tracked_hosts().await?;

        let mut removed = 0u64;
        for host_id in hosts {
            match self.store.purge_before(&host_id, cutoff).await {
                Ok(count) => removed += count,
                Err(e) => {
                    error!(host_id, error = %e, "Failed to purge expired history");
                }
            }
        }

        Ok(removed)
    }
}
