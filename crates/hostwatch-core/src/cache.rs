//! Recent-metrics cache
//!
//! A bounded, per-host, in-process buffer of the most recent samples. The
//! cache is the only structure mutated by concurrent heartbeat handlers;
//! `DashMap` gives each host entry its own shard lock, so appends for
//! different hosts never contend. Contents are lost on restart — the durable
//! tier is the source of truth for anything older than the in-process
//! window.

use std::collections::{HashMap, VecDeque};

use dashmap::DashMap;

use crate::models::HostMetrics;

/// Bounded per-host buffer of recent samples
pub struct RecentMetricsCache {
    entries: DashMap<String, VecDeque<HostMetrics>>,
    capacity: usize,
}

impl RecentMetricsCache {
    /// Create a cache holding up to `capacity` samples per host
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a sample, evicting the oldest when the host buffer is full
    pub fn append(&self, host_id: &str, sample: HostMetrics) {
        let mut entry = self
            .entries
            .entry(host_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));

        if entry.len() >= self.capacity {
            entry.pop_front();
        }
        entry.push_back(sample);
    }

    /// Most recent sample for a host
    pub fn latest(&self, host_id: &str) -> Option<HostMetrics> {
        self.entries
            .get(host_id)
            .and_then(|entry| entry.back().cloned())
    }

    /// Full in-memory sequence for a host, oldest-first
    pub fn history(&self, host_id: &str) -> Vec<HostMetrics> {
        self.entries
            .get(host_id)
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Latest sample for every host currently tracked
    pub fn snapshot_latest_all(&self) -> HashMap<String, HostMetrics> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .back()
                    .map(|sample| (entry.key().clone(), sample.clone()))
            })
            .collect()
    }

    /// Drop a host's buffer entirely
    pub fn remove_host(&self, host_id: &str) {
        self.entries.remove(host_id);
    }

    /// Number of hosts currently tracked
    pub fn host_count(&self) -> usize {
        self.entries.len()
    }

    /// Configured per-host capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
