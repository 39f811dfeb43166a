//! In-memory time-series store
//!
//! Mirrors the Redis shapes closely enough to honor the full
//! [`TimeSeriesStore`](super::TimeSeriesStore) contract: per-host current
//! slot with expiry, timestamp-ordered history, and a tracked-host index.
//! Used by tests and by development runs without a Redis instance; it
//! provides no durability across restarts.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::HostMetrics;

use super::{StoreError, TimeSeriesStore};

#[derive(Default)]
struct HostSeries {
    current: Option<(HostMetrics, Instant)>,
    // One sample per timestamp, matching the sorted-set member dedup upstream.
    history: BTreeMap<i64, HostMetrics>,
}

#[derive(Default)]
struct Inner {
    series: HashMap<String, HostSeries>,
    hosts: HashSet<String>,
}

/// Process-local implementation of the durable store contract
#[derive(Default)]
pub struct MemoryTimeSeries {
    inner: Mutex<Inner>,
}

impl MemoryTimeSeries {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TimeSeriesStore for MemoryTimeSeries {
    async fn put_current(
        &self,
        host_id: &str,
        sample: &HostMetrics,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let series = inner.series.entry(host_id.to_string()).or_default();
        series.current = Some((sample.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn get_current(&self, host_id: &str) -> Result<Option<HostMetrics>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.series.get(host_id).and_then(|series| {
            series
                .current
                .as_ref()
                .filter(|(_, expires)| *expires > Instant::now())
                .map(|(sample, _)| sample.clone())
        }))
    }

    async fn append_history(&self, host_id: &str, sample: &HostMetrics) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let series = inner.series.entry(host_id.to_string()).or_default();
        series.history.insert(sample.timestamp, sample.clone());
        Ok(())
    }

    async fn set_history_retention(&self, _host_id: &str, _ttl: Duration) -> Result<(), StoreError> {
        // Collection-level expiry is a Redis concern; the sweep's purge_before
        // is the only retention mechanism that applies here.
        Ok(())
    }

    async fn track_host(&self, host_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.hosts.insert(host_id.to_string());
        Ok(())
    }

    async fn tracked_hosts(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.hosts.iter().cloned().collect())
    }

    async fn range_history(
        &self,
        host_id: &str,
        start: i64,
        end: i64,
        limit: usize,
    ) -> Result<Vec<HostMetrics>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .series
            .get(host_id)
            .map(|series| {
                series
                    .history
                    .range(start..=end)
                    .take(limit)
                    .map(|(_, sample)| sample.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn recent_history(
        &self,
        host_id: &str,
        count: usize,
    ) -> Result<Vec<HostMetrics>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .series
            .get(host_id)
            .map(|series| {
                series
                    .history
                    .values()
                    .rev()
                    .take(count)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn purge_before(&self, host_id: &str, cutoff: i64) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        let Some(series) = inner.series.get_mut(host_id) else {
            return Ok(0);
        };

        let kept = series.history.split_off(&cutoff);
        let removed = series.history.len() as u64;
        series.history = kept;
        Ok(removed)
    }

    async fn delete_host(&self, host_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.series.remove(host_id);
        inner.hosts.remove(host_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(host_id: &str, timestamp: i64) -> HostMetrics {
        HostMetrics::new(host_id, timestamp)
    }

    #[tokio::test]
    async fn test_current_slot_round_trip() {
        let store = MemoryTimeSeries::new();
        let mut s = sample("h1", 1000);
        s.cpu.usage_percent = 55.0;

        store
            .put_current("h1", &s, Duration::from_secs(60))
            .await
            .unwrap();

        let got = store.get_current("h1").await.unwrap().unwrap();
        assert_eq!(got, s);
        assert!(store.get_current("h2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_round_trip_deep_equal() {
        let store = MemoryTimeSeries::new();
        let mut s = sample("h1", 5000);
        s.memory.usage_percent = 71.2;
        s.network.bytes_in = 1234;

        store.append_history("h1", &s).await.unwrap();

        let got = store.range_history("h1", 4000, 6000, 10).await.unwrap();
        assert_eq!(got, vec![s]);
    }

    #[tokio::test]
    async fn test_range_is_inclusive_ordered_and_capped() {
        let store = MemoryTimeSeries::new();
        for ts in [300, 100, 500, 200, 400] {
            store.append_history("h1", &sample("h1", ts)).await.unwrap();
        }

        let got = store.range_history("h1", 200, 400, 10).await.unwrap();
        let timestamps: Vec<i64> = got.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![200, 300, 400]);

        let capped = store.range_history("h1", 100, 500, 2).await.unwrap();
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].timestamp, 100);
    }

    #[tokio::test]
    async fn test_recent_history_newest_first() {
        let store = MemoryTimeSeries::new();
        for ts in [100, 200, 300, 400] {
            store.append_history("h1", &sample("h1", ts)).await.unwrap();
        }

        let got = store.recent_history("h1", 3).await.unwrap();
        let timestamps: Vec<i64> = got.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![400, 300, 200]);
    }

    #[tokio::test]
    async fn test_purge_before_removes_strictly_older() {
        let store = MemoryTimeSeries::new();
        for ts in [100, 200, 300, 400] {
            store.append_history("h1", &sample("h1", ts)).await.unwrap();
        }

        let removed = store.purge_before("h1", 300).await.unwrap();
        assert_eq!(removed, 2);

        let left = store.range_history("h1", 0, i64::MAX, 10).await.unwrap();
        let timestamps: Vec<i64> = left.iter().map(|s| s.timestamp).collect();
        // Entry at the cutoff itself survives.
        assert_eq!(timestamps, vec![300, 400]);

        assert_eq!(store.purge_before("unknown", 1000).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_track_and_delete_host() {
        let store = MemoryTimeSeries::new();
        store.track_host("h1").await.unwrap();
        store.track_host("h2").await.unwrap();
        store.track_host("h1").await.unwrap();
        store.append_history("h1", &sample("h1", 100)).await.unwrap();
        store
            .put_current("h1", &sample("h1", 100), Duration::from_secs(60))
            .await
            .unwrap();

        let mut hosts = store.tracked_hosts().await.unwrap();
        hosts.sort();
        assert_eq!(hosts, vec!["h1", "h2"]);

        store.delete_host("h1").await.unwrap();
        assert_eq!(store.tracked_hosts().await.unwrap(), vec!["h2"]);
        assert!(store.get_current("h1").await.unwrap().is_none());
        assert!(store
            .range_history("h1", 0, i64::MAX, 10)
            .await
            .unwrap()
            .is_empty());
    }
}
