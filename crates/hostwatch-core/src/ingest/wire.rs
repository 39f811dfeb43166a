//! Heartbeat wire formats
//!
//! Two incompatible JSON shapes arrive for the same logical operation: the
//! legacy agent pushes a flat metrics object close to the canonical sample,
//! the v2 agent sends a tenant slug plus a nested object with different
//! field names and units (`loadAvg1/5/15` instead of an array, `available`
//! memory instead of `free`). Each variant normalizes itself into
//! [`HostMetrics`]; absent metric fields default to zero rather than failing
//! the request.

use serde::Deserialize;

use crate::models::{AgentStatus, HostMetrics};

/// A heartbeat in either wire format
#[derive(Debug)]
pub enum HeartbeatPayload {
    /// v1 flat shape, tenant identified out of band
    Legacy(LegacyHeartbeat),
    /// v2 nested shape carrying the tenant slug
    V2(V2Heartbeat),
}

impl HeartbeatPayload {
    /// Explicit host id from the payload, if any
    pub fn host_id(&self) -> Option<&str> {
        match self {
            HeartbeatPayload::Legacy(hb) => hb.host_id.as_deref(),
            HeartbeatPayload::V2(hb) => hb.host_id.as_deref(),
        }
    }

    /// Hostname from the payload, if any
    pub fn hostname(&self) -> Option<&str> {
        match self {
            HeartbeatPayload::Legacy(hb) => hb.hostname.as_deref(),
            HeartbeatPayload::V2(hb) => hb.hostname.as_deref(),
        }
    }

    /// Host metadata (os, platform)
    pub fn host_meta(&self) -> (Option<&str>, Option<&str>) {
        match self {
            HeartbeatPayload::Legacy(hb) => (hb.os.as_deref(), hb.platform.as_deref()),
            HeartbeatPayload::V2(hb) => (hb.os.as_deref(), hb.platform.as_deref()),
        }
    }

    /// Agent fields (version, status, pid)
    pub fn agent(&self) -> (Option<&str>, AgentStatus, Option<i32>) {
        match self {
            HeartbeatPayload::Legacy(hb) => (
                hb.agent_version.as_deref(),
                hb.agent_status
                    .as_deref()
                    .map(AgentStatus::parse)
                    .unwrap_or_default(),
                hb.agent_pid,
            ),
            HeartbeatPayload::V2(hb) => (
                hb.agent.version.as_deref(),
                hb.agent
                    .status
                    .as_deref()
                    .map(AgentStatus::parse)
                    .unwrap_or_default(),
                hb.agent.pid,
            ),
        }
    }

    /// Sample timestamp, or `fallback_ms` when the payload carries none
    pub fn timestamp(&self, fallback_ms: i64) -> i64 {
        let ts = match self {
            HeartbeatPayload::Legacy(hb) => hb.timestamp,
            HeartbeatPayload::V2(hb) => hb.timestamp,
        };
        ts.unwrap_or(fallback_ms)
    }

    /// Normalize into the canonical sample keyed by `host_key`
    pub fn to_sample(&self, host_key: &str, fallback_ms: i64) -> HostMetrics {
        let mut sample = HostMetrics::new(host_key, self.timestamp(fallback_ms));
        match self {
            HeartbeatPayload::Legacy(hb) => hb.metrics.fill(&mut sample),
            HeartbeatPayload::V2(hb) => hb.metrics.fill(&mut sample),
        }
        sample
    }
}

// --- Legacy (v1) shape ---

/// v1 heartbeat body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyHeartbeat {
    /// Explicit host id, if the agent already knows it
    pub host_id: Option<String>,
    /// Hostname, used to resolve or create the host
    pub hostname: Option<String>,
    /// Operating system
    pub os: Option<String>,
    /// Platform/architecture
    pub platform: Option<String>,
    /// Agent software version
    pub agent_version: Option<String>,
    /// Agent run state string
    pub agent_status: Option<String>,
    /// Agent process id
    pub agent_pid: Option<i32>,
    /// Sample timestamp in epoch millis
    pub timestamp: Option<i64>,
    /// Metric readings
    #[serde(default)]
    pub metrics: LegacyMetrics,
}

/// v1 flat metrics object
#[derive(Debug, Default, Deserialize)]
pub struct LegacyMetrics {
    #[serde(default)]
    cpu: LegacyCpu,
    #[serde(default)]
    memory: LegacyGauge,
    #[serde(default)]
    disk: LegacyGauge,
    #[serde(default)]
    network: LegacyNetwork,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCpu {
    #[serde(default)]
    usage: f64,
    #[serde(default)]
    cores: i32,
    #[serde(default)]
    load_avg: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyGauge {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    used: u64,
    #[serde(default)]
    free: u64,
    #[serde(default)]
    usage: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyNetwork {
    #[serde(default)]
    bytes_in: u64,
    #[serde(default)]
    bytes_out: u64,
    #[serde(default)]
    packets_in: u64,
    #[serde(default)]
    packets_out: u64,
}

impl LegacyMetrics {
    fn fill(&self, sample: &mut HostMetrics) {
        sample.cpu.usage_percent = self.cpu.usage;
        sample.cpu.cores = self.cpu.cores;
        for (slot, value) in sample.cpu.load_avg.iter_mut().zip(&self.cpu.load_avg) {
            *slot = *value;
        }

        fill_gauge(
            &mut sample.memory.total_bytes,
            &mut sample.memory.used_bytes,
            &mut sample.memory.free_bytes,
            &mut sample.memory.usage_percent,
            self.memory.total,
            self.memory.used,
            Some(self.memory.free),
            self.memory.usage,
        );
        fill_gauge(
            &mut sample.disk.total_bytes,
            &mut sample.disk.used_bytes,
            &mut sample.disk.free_bytes,
            &mut sample.disk.usage_percent,
            self.disk.total,
            self.disk.used,
            Some(self.disk.free),
            self.disk.usage,
        );

        sample.network.bytes_in = self.network.bytes_in;
        sample.network.bytes_out = self.network.bytes_out;
        sample.network.packets_in = self.network.packets_in;
        sample.network.packets_out = self.network.packets_out;
    }
}

// --- V2 shape ---

/// v2 heartbeat body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V2Heartbeat {
    /// Tenant slug identifying the sender
    pub tenant: String,
    /// Explicit host id, if the agent already knows it
    pub host_id: Option<String>,
    /// Hostname, used to resolve or create the host
    pub hostname: Option<String>,
    /// Operating system
    pub os: Option<String>,
    /// Platform/architecture
    pub platform: Option<String>,
    /// Sample timestamp in epoch millis
    pub timestamp: Option<i64>,
    /// Agent descriptor
    #[serde(default)]
    pub agent: V2Agent,
    /// Metric readings
    #[serde(default)]
    pub metrics: V2Metrics,
}

/// v2 nested agent object
#[derive(Debug, Default, Deserialize)]
pub struct V2Agent {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    pid: Option<i32>,
}

/// v2 nested metrics object
#[derive(Debug, Default, Deserialize)]
pub struct V2Metrics {
    #[serde(default)]
    cpu: V2Cpu,
    #[serde(default)]
    memory: V2Memory,
    #[serde(default)]
    disk: V2Disk,
    #[serde(default)]
    network: V2Network,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2Cpu {
    #[serde(default)]
    usage_percent: f64,
    #[serde(default)]
    cores: i32,
    #[serde(default)]
    load_avg1: f64,
    #[serde(default)]
    load_avg5: f64,
    #[serde(default)]
    load_avg15: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2Memory {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    used: u64,
    /// v2 reports available memory, which maps onto the canonical free slot
    #[serde(default)]
    available: u64,
    #[serde(default)]
    usage_percent: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2Disk {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    used: u64,
    #[serde(default)]
    free: u64,
    #[serde(default)]
    usage_percent: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2Network {
    #[serde(default)]
    rx_bytes: u64,
    #[serde(default)]
    tx_bytes: u64,
    #[serde(default)]
    rx_packets: u64,
    #[serde(default)]
    tx_packets: u64,
}

impl V2Metrics {
    fn fill(&self, sample: &mut HostMetrics) {
        sample.cpu.usage_percent = self.cpu.usage_percent;
        sample.cpu.cores = self.cpu.cores;
        sample.cpu.load_avg = [self.cpu.load_avg1, self.cpu.load_avg5, self.cpu.load_avg15];

        fill_gauge(
            &mut sample.memory.total_bytes,
            &mut sample.memory.used_bytes,
            &mut sample.memory.free_bytes,
            &mut sample.memory.usage_percent,
            self.memory.total,
            self.memory.used,
            Some(self.memory.available),
            self.memory.usage_percent,
        );
        fill_gauge(
            &mut sample.disk.total_bytes,
            &mut sample.disk.used_bytes,
            &mut sample.disk.free_bytes,
            &mut sample.disk.usage_percent,
            self.disk.total,
            self.disk.used,
            Some(self.disk.free),
            self.disk.usage_percent,
        );

        sample.network.bytes_in = self.network.rx_bytes;
        sample.network.bytes_out = self.network.tx_bytes;
        sample.network.packets_in = self.network.rx_packets;
        sample.network.packets_out = self.network.tx_packets;
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_gauge(
    total_out: &mut u64,
    used_out: &mut u64,
    free_out: &mut u64,
    usage_out: &mut f64,
    total: u64,
    used: u64,
    free: Option<u64>,
    usage: Option<f64>,
) {
    *total_out = total;
    *used_out = used;
    *free_out = free.unwrap_or_else(|| total.saturating_sub(used));
    *usage_out = usage.unwrap_or_else(|| {
        if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_legacy_full_payload() {
        let body = serde_json::json!({
            "hostId": "4a6f1c3e-0000-0000-0000-000000000001",
            "hostname": "web-01",
            "os": "linux",
            "agentVersion": "1.4.2",
            "agentStatus": "running",
            "agentPid": 4242,
            "timestamp": 1_700_000_000_000i64,
            "metrics": {
                "cpu": { "usage": 92.5, "cores": 8, "loadAvg": [1.2, 0.9, 0.7] },
                "memory": { "total": 1000, "used": 600, "free": 400, "usage": 60.0 },
                "disk": { "total": 2000, "used": 500, "free": 1500 },
                "network": { "bytesIn": 10, "bytesOut": 20, "packetsIn": 3, "packetsOut": 4 }
            }
        });
        let hb: LegacyHeartbeat = serde_json::from_value(body).unwrap();
        let payload = HeartbeatPayload::Legacy(hb);

        assert_eq!(payload.hostname(), Some("web-01"));
        let (version, status, pid) = payload.agent();
        assert_eq!(version, Some("1.4.2"));
        assert!(status.is_running());
        assert_eq!(pid, Some(4242));

        let sample = payload.to_sample("h-key", 0);
        assert_eq!(sample.host_id, "h-key");
        assert_eq!(sample.timestamp, 1_700_000_000_000);
        assert_eq!(sample.cpu.usage_percent, 92.5);
        assert_eq!(sample.cpu.load_avg, [1.2, 0.9, 0.7]);
        assert_eq!(sample.memory.usage_percent, 60.0);
        // Disk usage was absent: computed from used/total.
        assert_eq!(sample.disk.usage_percent, 25.0);
        assert_eq!(sample.network.bytes_out, 20);
    }

    #[test]
    fn test_legacy_absent_fields_default_to_zero() {
        let hb: LegacyHeartbeat = serde_json::from_value(serde_json::json!({
            "hostname": "bare-host"
        }))
        .unwrap();
        let payload = HeartbeatPayload::Legacy(hb);

        let sample = payload.to_sample("h-key", 12345);
        assert_eq!(sample.timestamp, 12345);
        assert_eq!(sample, HostMetrics::new("h-key", 12345));
    }

    #[test]
    fn test_legacy_short_load_avg_array() {
        let hb: LegacyHeartbeat = serde_json::from_value(serde_json::json!({
            "hostname": "web-01",
            "metrics": { "cpu": { "usage": 10.0, "loadAvg": [2.5] } }
        }))
        .unwrap();
        let sample = HeartbeatPayload::Legacy(hb).to_sample("h", 0);
        assert_eq!(sample.cpu.load_avg, [2.5, 0.0, 0.0]);
    }

    #[test]
    fn test_v2_payload_normalizes_names_and_units() {
        let body = serde_json::json!({
            "tenant": "acme",
            "hostname": "db-02",
            "agent": { "version": "2.0.1", "status": "stopped", "pid": 77 },
            "metrics": {
                "cpu": { "usagePercent": 45.0, "cores": 16, "loadAvg1": 3.0, "loadAvg5": 2.0, "loadAvg15": 1.0 },
                "memory": { "total": 4000, "used": 1000, "available": 3000 },
                "network": { "rxBytes": 111, "txBytes": 222, "rxPackets": 5, "txPackets": 6 }
            }
        });
        let hb: V2Heartbeat = serde_json::from_value(body).unwrap();
        assert_eq!(hb.tenant, "acme");
        let payload = HeartbeatPayload::V2(hb);

        let (version, status, _) = payload.agent();
        assert_eq!(version, Some("2.0.1"));
        assert!(!status.is_running());

        let sample = payload.to_sample("h-key", 99);
        assert_eq!(sample.cpu.load_avg, [3.0, 2.0, 1.0]);
        // `available` lands in the canonical free slot; usage is computed.
        assert_eq!(sample.memory.free_bytes, 3000);
        assert_eq!(sample.memory.usage_percent, 25.0);
        assert_eq!(sample.network.bytes_in, 111);
        assert_eq!(sample.network.packets_out, 6);
        assert_eq!(sample.timestamp, 99);
    }

    #[test]
    fn test_v2_missing_agent_defaults_to_running() {
        let hb: V2Heartbeat = serde_json::from_value(serde_json::json!({
            "tenant": "acme",
            "hostname": "db-02"
        }))
        .unwrap();
        let (_, status, pid) = HeartbeatPayload::V2(hb).agent();
        assert!(status.is_running());
        assert_eq!(pid, None);
    }
}
