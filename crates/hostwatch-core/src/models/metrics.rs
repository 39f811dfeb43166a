//! Canonical metrics sample
//!
//! Both heartbeat wire formats normalize into [`HostMetrics`] before any
//! downstream component sees the data. Samples are immutable once built and
//! ordered by `timestamp` ascending within a host.

use serde::{Deserialize, Serialize};

/// One normalized, timestamped set of resource readings for one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMetrics {
    /// Host identifier (UUID string)
    pub host_id: String,

    /// Sample time, epoch milliseconds
    pub timestamp: i64,

    /// CPU readings
    pub cpu: CpuMetrics,

    /// Memory readings
    pub memory: MemoryMetrics,

    /// Disk readings
    pub disk: DiskMetrics,

    /// Network counters
    pub network: NetworkMetrics,
}

impl HostMetrics {
    /// Create an all-zero sample for a host at a given time
    pub fn new(host_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            host_id: host_id.into(),
            timestamp,
            cpu: CpuMetrics::default(),
            memory: MemoryMetrics::default(),
            disk: DiskMetrics::default(),
            network: NetworkMetrics::default(),
        }
    }
}

/// CPU readings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    /// Utilization, 0-100
    pub usage_percent: f64,
    /// Logical core count
    pub cores: i32,
    /// 1/5/15 minute load averages
    pub load_avg: [f64; 3],
}

/// Memory readings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    /// Total bytes
    pub total_bytes: u64,
    /// Used bytes
    pub used_bytes: u64,
    /// Free bytes
    pub free_bytes: u64,
    /// Utilization, 0-100
    pub usage_percent: f64,
}

/// Disk readings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    /// Total bytes
    pub total_bytes: u64,
    /// Used bytes
    pub used_bytes: u64,
    /// Free bytes
    pub free_bytes: u64,
    /// Utilization, 0-100
    pub usage_percent: f64,
}

/// Network counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    /// Bytes received
    pub bytes_in: u64,
    /// Bytes sent
    pub bytes_out: u64,
    /// Packets received
    pub packets_in: u64,
    /// Packets sent
    pub packets_out: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sample_is_zeroed() {
        let sample = HostMetrics::new("h1", 1000);
        assert_eq!(sample.host_id, "h1");
        assert_eq!(sample.timestamp, 1000);
        assert_eq!(sample.cpu.usage_percent, 0.0);
        assert_eq!(sample.memory.total_bytes, 0);
        assert_eq!(sample.network.packets_out, 0);
    }

    #[test]
    fn test_json_round_trip() {
        let mut sample = HostMetrics::new("h1", 42);
        sample.cpu.usage_percent = 87.5;
        sample.cpu.load_avg = [0.5, 0.4, 0.3];
        sample.disk.total_bytes = 1 << 40;

        let json = serde_json::to_string(&sample).unwrap();
        let back: HostMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
