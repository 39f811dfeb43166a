//! Heartbeat ingestion
//!
//! One pipeline behind both heartbeat endpoints. Order matters: everything
//! up to and including the cache append can abort the request; once the
//! sample is in the cache the heartbeat is acknowledged no matter what
//! alerting does.

mod wire;

pub use wire::{HeartbeatPayload, LegacyHeartbeat, V2Heartbeat};

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::alerts::AlertEvaluator;
use crate::cache::RecentMetricsCache;
use crate::error::{Error, Result};
use crate::models::{Agent, AgentStatus, Host, Tenant};

/// How a heartbeat identifies its tenant
#[derive(Debug, Clone)]
pub enum TenantRef {
    /// v1: tenant id from the `x-tenant-id` header
    Id(Uuid),
    /// v2: tenant slug from the body
    Slug(String),
}

/// Relational registry seam for tenants, hosts, and agents
#[async_trait::async_trait]
pub trait HostRegistry: Send + Sync {
    /// Look up a tenant by id
    async fn tenant_by_id(&self, id: Uuid) -> Result<Option<Tenant>>;

    /// Look up a tenant by slug
    async fn tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>>;

    /// Look up a host by id
    async fn host_by_id(&self, id: Uuid) -> Result<Option<Host>>;

    /// Resolve or create a host by `(tenant_id, hostname)` in one atomic
    /// statement, refreshing metadata and `last_seen_at`
    async fn upsert_host(
        &self,
        tenant_id: Uuid,
        hostname: &str,
        os: Option<&str>,
        platform: Option<&str>,
    ) -> Result<Host>;

    /// Refresh a known host's `last_seen_at`
    async fn touch_host(&self, id: Uuid) -> Result<()>;

    /// Create or update the host's agent row in one atomic statement
    async fn upsert_agent(
        &self,
        host_id: Uuid,
        version: Option<&str>,
        status: AgentStatus,
        pid: Option<i32>,
    ) -> Result<Agent>;
}

/// Normalizes heartbeats, records them, and triggers alert evaluation
pub struct HeartbeatPipeline {
    registry: Arc<dyn HostRegistry>,
    cache: Arc<RecentMetricsCache>,
    evaluator: AlertEvaluator,
}

impl HeartbeatPipeline {
    /// Create a pipeline
    pub fn new(
        registry: Arc<dyn HostRegistry>,
        cache: Arc<RecentMetricsCache>,
        evaluator: AlertEvaluator,
    ) -> Self {
        Self {
            registry,
            cache,
            evaluator,
        }
    }

    /// Ingest one heartbeat; returns the host id to acknowledge with.
    ///
    /// Evaluation failures after the cache append are logged and swallowed:
    /// a heartbeat that recorded its sample is acknowledged regardless.
    pub async fn ingest(&self, tenant_ref: TenantRef, payload: HeartbeatPayload) -> Result<Uuid> {
        let tenant = self.resolve_tenant(&tenant_ref).await?;
        let host = self.resolve_host(&tenant, &payload).await?;

        let (version, status, pid) = payload.agent();
        self.registry
            .upsert_agent(host.id, version, status, pid)
            .await?;

        let host_key = host.id.to_string();
        let sample = payload.to_sample(&host_key, Utc::now().timestamp_millis());
        self.cache.append(&host_key, sample.clone());

        debug!(host_id = %host.id, tenant = %tenant.slug, "Heartbeat recorded");

        if let Err(e) = self
            .evaluator
            .evaluate(tenant.id, host.id, &sample, status.is_running())
            .await
        {
            error!(host_id = %host.id, error = %e, "Alert evaluation failed");
        }

        Ok(host.id)
    }

    async fn resolve_tenant(&self, tenant_ref: &TenantRef) -> Result<Tenant> {
        let tenant = match tenant_ref {
            TenantRef::Id(id) => self.registry.tenant_by_id(*id).await?,
            TenantRef::Slug(slug) => self.registry.tenant_by_slug(slug).await?,
        };

        tenant.ok_or_else(|| match tenant_ref {
            TenantRef::Id(id) => Error::not_found("Tenant", id.to_string()),
            TenantRef::Slug(slug) => Error::not_found("Tenant", slug.clone()),
        })
    }

    /// Resolve by explicit id when the payload carries one, otherwise
    /// resolve-or-create by hostname within the tenant.
    async fn resolve_host(&self, tenant: &Tenant, payload: &HeartbeatPayload) -> Result<Host> {
        if let Some(raw_id) = payload.host_id() {
            let id = Uuid::parse_str(raw_id)
                .map_err(|_| Error::validation(format!("Invalid host id: {raw_id}")))?;

            if let Some(host) = self.registry.host_by_id(id).await? {
                if host.tenant_id != tenant.id {
                    return Err(Error::not_found("Host", id.to_string()));
                }
                self.registry.touch_host(host.id).await?;
                return Ok(host);
            }
            // Unknown id: fall through to hostname creation when possible.
        }

        let hostname = payload
            .hostname()
            .ok_or_else(|| Error::validation("Heartbeat is missing a host identifier"))?;

        let (os, platform) = payload.host_meta();
        self.registry
            .upsert_host(tenant.id, hostname, os, platform)
            .await
    }
}
