//! Batch persistence scheduler
//!
//! Every tick, the latest sample for each cached host is written to the
//! durable store (current slot + history + retention refresh + host index).
//! A failed write is logged and dropped; the next tick retries with fresh
//! data, and the newer sample always supersedes the older one, so no backoff
//! or redelivery is needed.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::cache::RecentMetricsCache;
use crate::store::TimeSeriesStore;

/// Outcome of a single drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Hosts persisted successfully
    pub persisted: usize,
    /// Hosts whose writes failed and were dropped
    pub failed: usize,
}

/// Periodic cache-to-store drain
pub struct BatchScheduler {
    cache: Arc<RecentMetricsCache>,
    store: Arc<dyn TimeSeriesStore>,
    tick_interval: Duration,
    current_ttl: Duration,
    retention_ttl: Duration,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl BatchScheduler {
    /// Create a scheduler draining `cache` into `store`
    pub fn new(
        cache: Arc<RecentMetricsCache>,
        store: Arc<dyn TimeSeriesStore>,
        tick_interval: Duration,
        current_ttl: Duration,
        retention_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            store,
            tick_interval,
            current_ttl,
            retention_ttl,
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Start the periodic drain task
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.lock() = Some(shutdown_tx);

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            info!(interval = ?scheduler.tick_interval, "Batch scheduler started");
            let mut ticker = interval(scheduler.tick_interval);
            // The first tick of tokio's interval fires immediately; skip it so
            // the first drain happens one full interval after startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let stats = scheduler.flush_now().await;
                        if stats.failed > 0 {
                            error!(
                                persisted = stats.persisted,
                                failed = stats.failed,
                                "Batch persistence tick completed with failures"
                            );
                        } else if stats.persisted > 0 {
                            debug!(persisted = stats.persisted, "Batch persistence tick completed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Batch scheduler shutting down");
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

    /// Drain the cache's latest-sample snapshot into the store once.
    ///
    /// Called by every tick and once more during graceful shutdown. Per-host
    /// failures are logged and counted, never propagated.
    pub async fn flush_now(&self) -> FlushStats {
        let snapshot = self.cache.snapshot_latest_all();
        let mut stats = FlushStats::default();

        for (host_id, sample) in snapshot {
            match self.persist_host(&host_id, &sample).await {
                Ok(()) => stats.persisted += 1,
                Err(e) => {
                    stats.failed += 1;
                    error!(host_id, error = %e, "Failed to persist host snapshot");
                }
            }
        }

        stats
    }

    async fn persist_host(
        &self,
        host_id: &str,
        sample: &crate::models::HostMetrics,
    ) -> Result<(), crate::store::StoreError> {
        self.store
            .put_current(host_id, sample, self.current_ttl)
            .await?;
        self.store.append_history(host_id, sample).await?;
        self.store
            .set_history_retention(host_id, self.retention_ttl)
            .await?;
        self.store.track_host(host_id).await?;
        Ok(())
    }
}
