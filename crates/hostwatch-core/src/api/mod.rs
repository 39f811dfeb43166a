//! REST API implementation
//!
//! Wires the ingestion pipeline, stores, and background tasks together and
//! serves the HTTP API. Also owns the graceful shutdown sequence: stop
//! accepting connections, stop the scheduler and sweeper, run one final
//! flush, close the pools — all racing a hard timeout.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;

use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::alerts::{AlertEvaluator, AlertRepository};
use crate::cache::RecentMetricsCache;
use crate::config::Config;
use crate::db::{Database, HostRepository};
use crate::error::{Error, Result};
use crate::ingest::HeartbeatPipeline;
use crate::persist::{BatchScheduler, RetentionSweeper};
use crate::store::TimeSeriesStore;

/// The assembled Hostwatch service
pub struct Server {
    config: Config,
    db: Database,
    cache: Arc<RecentMetricsCache>,
    store: Arc<dyn TimeSeriesStore>,
    scheduler: Arc<BatchScheduler>,
    sweeper: Arc<RetentionSweeper>,
    state: AppState,
}

impl Server {
    /// Construct the service: connect pools, build the pipeline and the
    /// background tasks. Nothing is started yet.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::new(&config).await?;

        let cache = Arc::new(RecentMetricsCache::new(config.cache.capacity));
        let store: Arc<dyn TimeSeriesStore> = Arc::new(db.timeseries.clone());

        let registry = Arc::new(HostRepository::new(db.postgres.pool().clone()));
        let alerts = Arc::new(AlertRepository::new(db.postgres.pool().clone()));

        let evaluator = AlertEvaluator::new(alerts.clone());
        let pipeline = Arc::new(HeartbeatPipeline::new(
            registry,
            Arc::clone(&cache),
            evaluator,
        ));

        let scheduler = Arc::new(BatchScheduler::new(
            Arc::clone(&cache),
            Arc::clone(&store),
            config.persistence.batch_interval(),
            config.persistence.current_ttl(),
            config.retention.window(),
        ));
        let sweeper = Arc::new(RetentionSweeper::new(
            Arc::clone(&store),
            config.retention.sweep_interval(),
            config.retention.window_ms(),
        ));

        let state = AppState {
            pipeline,
            cache: Arc::clone(&cache),
            store: Arc::clone(&store),
            alerts,
        };

        Ok(Self {
            config,
            db,
            cache,
            store,
            scheduler,
            sweeper,
            state,
        })
    }

    /// Run until a shutdown signal arrives, then drain and exit
    pub async fn serve(self) -> Result<()> {
        self.db.health_check().await?;

        let scheduler_handle = self.scheduler.start();
        let sweeper_handle = self.sweeper.start();

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        let app = create_router(self.state.clone()).layer(cors);

        let addr = self.config.server.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!(addr, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::internal(e.to_string()))?;

        // No new connections past this point; drain under the hard timeout.
        let timeout = self.config.server.shutdown_timeout();
        let shutdown = async {
            self.scheduler.stop().await;
            self.sweeper.stop().await;
            let _ = scheduler_handle.await;
            let _ = sweeper_handle.await;

            let stats = self.scheduler.flush_now().await;
            if stats.failed > 0 {
                error!(
                    persisted = stats.persisted,
                    failed = stats.failed,
                    "Final flush completed with failures"
                );
            } else {
                info!(persisted = stats.persisted, "Final flush complete");
            }

            self.db.close().await;
        };

        if tokio::time::timeout(timeout, shutdown).await.is_err() {
            warn!(?timeout, "Shutdown sequence exceeded hard timeout, exiting anyway");
        }

        info!(cached_hosts = self.cache.host_count(), "Shutdown complete");
        Ok(())
    }

    /// Durable store handle, for diagnostics
    pub fn store(&self) -> &Arc<dyn TimeSeriesStore> {
        &self.store
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
