//! Database layer for Hostwatch
//!
//! PostgreSQL holds the relational registry (tenants, hosts, agents, alert
//! rules, alerts, notification queue); Redis holds the time-series tier and
//! lives behind [`crate::store::RedisTimeSeries`].

mod postgres;

pub use postgres::{HostRepository, PostgresPool};

use crate::config::Config;
use crate::error::Result;
use crate::store::RedisTimeSeries;

/// Database connections bundle
#[derive(Clone)]
pub struct Database {
    /// PostgreSQL connection pool
    pub postgres: PostgresPool,
    /// Redis-backed durable time-series store
    pub timeseries: RedisTimeSeries,
}

impl Database {
    /// Create a new database connection bundle
    pub async fn new(config: &Config) -> Result<Self> {
        let postgres = PostgresPool::new(&config.database).await?;
        let timeseries = RedisTimeSeries::new(&config.redis)?;

        Ok(Self {
            postgres,
            timeseries,
        })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        self.postgres.migrate().await
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        self.postgres.health_check().await?;
        self.timeseries.health_check().await?;
        Ok(())
    }

    /// Close the relational pool
    pub async fn close(&self) {
        self.postgres.close().await;
    }
}
