//! Redis-backed time-series store
//!
//! Shapes: the current slot is a plain string with SETEX semantics, history
//! is a sorted set scored by sample timestamp (members are the JSON-encoded
//! samples), and the global host index is a set. Retention is enforced both
//! by the collection-level EXPIRE refreshed on every batch write and by the
//! retention sweep's ZREMRANGEBYSCORE.

use std::time::Duration;

use deadpool_redis::{Config as PoolSourceConfig, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use tracing::warn;

use crate::config::RedisConfig;
use crate::models::HostMetrics;

use super::{keys, StoreError, TimeSeriesStore};

/// Durable time-series store backed by a pooled Redis connection
#[derive(Clone)]
pub struct RedisTimeSeries {
    pool: Pool,
    retry_attempts: u32,
}

impl RedisTimeSeries {
    /// Create a store from configuration. Pool acquisition is bounded by the
    /// configured connect timeout so callers fail fast when Redis is down.
    pub fn new(config: &RedisConfig) -> Result<Self, StoreError> {
        let mut cfg = PoolSourceConfig::from_url(&config.url);

        let mut pool_cfg = PoolConfig::new(config.max_connections as usize);
        pool_cfg.timeouts.wait = Some(config.connect_timeout());
        pool_cfg.timeouts.create = Some(config.connect_timeout());
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            pool,
            retry_attempts: config.retry_attempts.max(1),
        })
    }

    /// Liveness probe
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(())
    }

    /// Acquire a pooled connection, retrying up to the configured attempt
    /// count. Each attempt is already bounded by the pool's wait timeout.
    async fn conn(&self) -> Result<deadpool_redis::Connection, StoreError> {
        let mut last_err = None;
        for attempt in 1..=self.retry_attempts {
            match self.pool.get().await {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    warn!(attempt, error = %e, "Redis connection acquisition failed");
                    last_err = Some(e.to_string());
                }
            }
        }
        Err(StoreError::Unavailable(
            last_err.unwrap_or_else(|| "no connection attempts made".to_string()),
        ))
    }
}

#[async_trait::async_trait]
impl TimeSeriesStore for RedisTimeSeries {
    async fn put_current(
        &self,
        host_id: &str,
        sample: &HostMetrics,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(sample)?;
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(keys::current(host_id), payload, ttl.as_secs())
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(())
    }

    async fn get_current(&self, host_id: &str) -> Result<Option<HostMetrics>, StoreError> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = conn
            .get(keys::current(host_id))
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn append_history(&self, host_id: &str, sample: &HostMetrics) -> Result<(), StoreError> {
        let payload = serde_json::to_string(sample)?;
        let mut conn = self.conn().await?;
        let _: () = conn
            .zadd(keys::history(host_id), payload, sample.timestamp)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(())
    }

    async fn set_history_retention(&self, host_id: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: bool = conn
            .expire(keys::history(host_id), ttl.as_secs() as i64)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(())
    }

    async fn track_host(&self, host_id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .sadd(keys::HOSTS_SET, host_id)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(())
    }

    async fn tracked_hosts(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn().await?;
        let hosts: Vec<String> = conn
            .smembers(keys::HOSTS_SET)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(hosts)
    }

    async fn range_history(
        &self,
        host_id: &str,
        start: i64,
        end: i64,
        limit: usize,
    ) -> Result<Vec<HostMetrics>, StoreError> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn
            .zrangebyscore_limit(keys::history(host_id), start, end, 0, limit as isize)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;

        Ok(decode_members(host_id, members))
    }

    async fn recent_history(
        &self,
        host_id: &str,
        count: usize,
    ) -> Result<Vec<HostMetrics>, StoreError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn().await?;
        let members: Vec<String> = conn
            .zrevrange(keys::history(host_id), 0, count as isize - 1)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;

        Ok(decode_members(host_id, members))
    }

    async fn purge_before(&self, host_id: &str, cutoff: i64) -> Result<u64, StoreError> {
        let mut conn = self.conn().await?;
        // Exclusive upper bound: entries with timestamp == cutoff stay.
        let removed: u64 = conn
            .zrembyscore(keys::history(host_id), "-inf", format!("({cutoff}"))
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(removed)
    }

    async fn delete_host(&self, host_id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .del(&[keys::current(host_id), keys::history(host_id)])
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        let _: () = conn
            .srem(keys::HOSTS_SET, host_id)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(())
    }
}

/// Decode sorted-set members, skipping (and logging) any corrupt entries
/// rather than failing the whole read.
fn decode_members(host_id: &str, members: Vec<String>) -> Vec<HostMetrics> {
    members
        .into_iter()
        .filter_map(|json| match serde_json::from_str(&json) {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!(host_id, error = %e, "Skipping undecodable history entry");
                None
            }
        })
        .collect()
}
