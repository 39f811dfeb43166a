//! Shared in-memory test doubles

use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingest::HostRegistry;
use crate::models::{
    Agent, AgentStatus, Alert, AlertRule, AlertStatus, Condition, CpuMetrics, Host, HostMetrics,
    MetricType, Severity, Tenant,
};
use crate::store::{StoreError, TimeSeriesStore};

/// A sample with only CPU usage set
pub fn cpu_sample(host_id: &str, timestamp: i64, usage: f64) -> HostMetrics {
    HostMetrics {
        cpu: CpuMetrics {
            usage_percent: usage,
            cores: 4,
            load_avg: [0.0; 3],
        },
        ..HostMetrics::new(host_id, timestamp)
    }
}

/// An enabled rule with the given shape and a fresh tenant id
pub fn rule_with(
    metric_type: MetricType,
    condition: Condition,
    threshold: i64,
    severity: Severity,
) -> AlertRule {
    let now = Utc::now();
    AlertRule {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        name: format!("{} {} {}", metric_type.as_str(), condition.as_str(), threshold),
        metric_type,
        condition,
        threshold,
        severity,
        enabled: true,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
struct RegistryInner {
    tenants: Vec<Tenant>,
    hosts: Vec<Host>,
    agents: Vec<Agent>,
    rules: Vec<AlertRule>,
    alerts: Vec<Alert>,
    notifications: usize,
}

/// In-memory registry implementing both relational seams
#[derive(Default)]
pub struct MemoryRegistry {
    inner: Mutex<RegistryInner>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tenant(&self, slug: &str) -> Tenant {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: slug.to_string(),
            created_at: Utc::now(),
        };
        self.inner.lock().tenants.push(tenant.clone());
        tenant
    }

    pub fn add_rule(&self, rule: AlertRule) {
        self.inner.lock().rules.push(rule);
    }

    pub fn queued_notifications(&self) -> usize {
        self.inner.lock().notifications
    }

    pub fn agent_for(&self, host_id: Uuid) -> Option<Agent> {
        self.inner
            .lock()
            .agents
            .iter()
            .find(|a| a.host_id == host_id)
            .cloned()
    }
}

#[async_trait::async_trait]
impl HostRegistry for MemoryRegistry {
    async fn tenant_by_id(&self, id: Uuid) -> Result<Option<Tenant>> {
        Ok(self
            .inner
            .lock()
            .tenants
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        Ok(self
            .inner
            .lock()
            .tenants
            .iter()
            .find(|t| t.slug == slug)
            .cloned())
    }

    async fn host_by_id(&self, id: Uuid) -> Result<Option<Host>> {
        Ok(self.inner.lock().hosts.iter().find(|h| h.id == id).cloned())
    }

    async fn upsert_host(
        &self,
        tenant_id: Uuid,
        hostname: &str,
        os: Option<&str>,
        platform: Option<&str>,
    ) -> Result<Host> {
        let mut inner = self.inner.lock();
        let now = Utc::now();

        if let Some(host) = inner
            .hosts
            .iter_mut()
            .find(|h| h.tenant_id == tenant_id && h.hostname == hostname)
        {
            host.last_seen_at = now;
            if let Some(os) = os {
                host.os = Some(os.to_string());
            }
            if let Some(platform) = platform {
                host.platform = Some(platform.to_string());
            }
            return Ok(host.clone());
        }

        let host = Host {
            id: Uuid::new_v4(),
            tenant_id,
            hostname: hostname.to_string(),
            os: os.map(str::to_string),
            platform: platform.map(str::to_string),
            created_at: now,
            last_seen_at: now,
        };
        inner.hosts.push(host.clone());
        Ok(host)
    }

    async fn touch_host(&self, id: Uuid) -> Result<()> {
        if let Some(host) = self.inner.lock().hosts.iter_mut().find(|h| h.id == id) {
            host.last_seen_at = Utc::now();
        }
        Ok(())
    }

    async fn upsert_agent(
        &self,
        host_id: Uuid,
        version: Option<&str>,
        status: AgentStatus,
        pid: Option<i32>,
    ) -> Result<Agent> {
        let mut inner = self.inner.lock();
        let now = Utc::now();

        if let Some(agent) = inner.agents.iter_mut().find(|a| a.host_id == host_id) {
            if let Some(version) = version {
                agent.version = Some(version.to_string());
            }
            agent.status = status;
            if pid.is_some() {
                agent.pid = pid;
            }
            agent.last_heartbeat_at = now;
            return Ok(agent.clone());
        }

        let agent = Agent {
            id: Uuid::new_v4(),
            host_id,
            version: version.map(str::to_string),
            status,
            pid,
            last_heartbeat_at: now,
        };
        inner.agents.push(agent.clone());
        Ok(agent)
    }
}

#[async_trait::async_trait]
impl crate::alerts::AlertStore for MemoryRegistry {
    async fn enabled_rules(&self, tenant_id: Uuid) -> Result<Vec<AlertRule>> {
        Ok(self
            .inner
            .lock()
            .rules
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.enabled)
            .cloned()
            .collect())
    }

    async fn open_alerts(&self, tenant_id: Uuid) -> Result<Vec<Alert>> {
        Ok(self
            .inner
            .lock()
            .alerts
            .iter()
            .filter(|a| a.tenant_id == tenant_id && a.is_open())
            .cloned()
            .collect())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<()> {
        self.inner.lock().alerts.push(alert.clone());
        Ok(())
    }

    async fn queue_notification(&self, _alert: &Alert) -> Result<()> {
        self.inner.lock().notifications += 1;
        Ok(())
    }

    async fn get_alert(&self, id: Uuid) -> Result<Option<Alert>> {
        Ok(self
            .inner
            .lock()
            .alerts
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn list_alerts(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self
            .inner
            .lock()
            .alerts
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        alerts.truncate(limit.max(0) as usize);
        Ok(alerts)
    }

    async fn acknowledge_alert(&self, id: Uuid) -> Result<Alert> {
        let mut inner = self.inner.lock();
        let alert = inner
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::not_found("Alert", id.to_string()))?;

        if alert.status != AlertStatus::Active {
            return Err(Error::InvalidState(format!(
                "Alert {} is {}, only active alerts can be acknowledged",
                id,
                alert.status.as_str()
            )));
        }
        alert.status = AlertStatus::Acknowledged;
        Ok(alert.clone())
    }

    async fn resolve_alert(&self, id: Uuid) -> Result<Alert> {
        let mut inner = self.inner.lock();
        let alert = inner
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::not_found("Alert", id.to_string()))?;

        if !alert.is_open() {
            return Err(Error::InvalidState(format!(
                "Alert {} is already resolved",
                id
            )));
        }
        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(Utc::now());
        Ok(alert.clone())
    }
}

/// A store whose every operation fails as unavailable
pub struct FailingTimeSeries;

#[async_trait::async_trait]
impl TimeSeriesStore for FailingTimeSeries {
    async fn put_current(
        &self,
        _host_id: &str,
        _sample: &HostMetrics,
        _ttl: Duration,
    ) -> std::result::Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn get_current(&self, _host_id: &str) -> std::result::Result<Option<HostMetrics>, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn append_history(
        &self,
        _host_id: &str,
        _sample: &HostMetrics,
    ) -> std::result::Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn set_history_retention(&self, _host_id: &str, _ttl: Duration) -> std::result::Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn track_host(&self, _host_id: &str) -> std::result::Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn tracked_hosts(&self) -> std::result::Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn range_history(
        &self,
        _host_id: &str,
        _start: i64,
        _end: i64,
        _limit: usize,
    ) -> std::result::Result<Vec<HostMetrics>, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn recent_history(
        &self,
        _host_id: &str,
        _count: usize,
    ) -> std::result::Result<Vec<HostMetrics>, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn purge_before(&self, _host_id: &str, _cutoff: i64) -> std::result::Result<u64, StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }

    async fn delete_host(&self, _host_id: &str) -> std::result::Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".into()))
    }
}
