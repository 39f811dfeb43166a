//! Durable time-series store
//!
//! The core depends on the durable tier through the narrow
//! [`TimeSeriesStore`] contract: a per-host "current value" slot with a short
//! TTL, a timestamp-ordered per-host history collection with a retention
//! expiry, and a global set of host identifiers that have ever reported.
//! Replication and durability belong to the backing store, not to this crate.
//!
//! [`RedisTimeSeries`] is the production implementation;
//! [`MemoryTimeSeries`] backs tests and redis-less development runs.

mod memory;
mod redis;

pub use memory::MemoryTimeSeries;
pub use redis::RedisTimeSeries;

use std::time::Duration;

use thiserror::Error;

use crate::models::HostMetrics;

/// Errors from the durable time-series tier
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not reach the store (pool exhausted, timeout, connection refused)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered but the command failed
    #[error("Store command failed: {0}")]
    Command(String),

    /// A stored sample could not be encoded/decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key/shape conventions for the Redis backing store
pub mod keys {
    /// Set of every host id that has ever reported
    pub const HOSTS_SET: &str = "hostwatch:hosts";

    /// String slot holding the latest sample for a host
    pub fn current(host_id: &str) -> String {
        format!("hostwatch:current:{host_id}")
    }

    /// Sorted set of historical samples for a host, scored by timestamp
    pub fn history(host_id: &str) -> String {
        format!("hostwatch:history:{host_id}")
    }
}

/// Narrow contract the core requires from the durable tier
///
/// Every call either completes or fails fast; implementations must not block
/// indefinitely when the store is unreachable.
#[async_trait::async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Overwrite the "latest" slot for a host, with an expiry
    async fn put_current(
        &self,
        host_id: &str,
        sample: &HostMetrics,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Read the "latest" slot for a host, if present and unexpired
    async fn get_current(&self, host_id: &str) -> Result<Option<HostMetrics>, StoreError>;

    /// Insert into the timestamp-ordered per-host history collection
    async fn append_history(&self, host_id: &str, sample: &HostMetrics) -> Result<(), StoreError>;

    /// Set or refresh the retention expiry on a host's history collection
    async fn set_history_retention(&self, host_id: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Add a host to the global set of identifiers that have ever reported
    async fn track_host(&self, host_id: &str) -> Result<(), StoreError>;

    /// All host identifiers that have ever reported
    async fn tracked_hosts(&self) -> Result<Vec<String>, StoreError>;

    /// Samples with `start <= timestamp <= end`, oldest-first, capped at `limit`
    async fn range_history(
        &self,
        host_id: &str,
        start: i64,
        end: i64,
        limit: usize,
    ) -> Result<Vec<HostMetrics>, StoreError>;

    /// The last `count` samples, newest-first
    async fn recent_history(
        &self,
        host_id: &str,
        count: usize,
    ) -> Result<Vec<HostMetrics>, StoreError>;

    /// Remove history entries with `timestamp < cutoff`; returns count removed
    async fn purge_before(&self, host_id: &str, cutoff: i64) -> Result<u64, StoreError>;

    /// Remove a host's current slot, history, and index membership
    async fn delete_host(&self, host_id: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_conventions() {
        assert_eq!(keys::current("h1"), "hostwatch:current:h1");
        assert_eq!(keys::history("h1"), "hostwatch:history:h1");
        assert_eq!(keys::HOSTS_SET, "hostwatch:hosts");
    }
}
