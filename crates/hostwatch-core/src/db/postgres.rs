//! PostgreSQL connection and the relational host registry

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::ingest::HostRegistry;
use crate::models::{Agent, AgentStatus, Host, Tenant};

/// PostgreSQL connection pool
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Create a new PostgreSQL connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::internal(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Postgres-backed tenant/host/agent registry
#[derive(Clone)]
pub struct HostRepository {
    pool: PgPool,
}

impl HostRepository {
    /// Create a new host repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HostRegistry for HostRepository {
    async fn tenant_by_id(&self, id: Uuid) -> Result<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn host_by_id(&self, id: Uuid) -> Result<Option<Host>> {
        let row = sqlx::query_as::<_, HostRow>("SELECT * FROM hosts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn upsert_host(
        &self,
        tenant_id: Uuid,
        hostname: &str,
        os: Option<&str>,
        platform: Option<&str>,
    ) -> Result<Host> {
        // One atomic statement so two concurrent heartbeats for a new host
        // cannot race a check-then-insert.
        let row = sqlx::query_as::<_, HostRow>(
            r#"
            INSERT INTO hosts (id, tenant_id, hostname, os, platform, created_at, last_seen_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (tenant_id, hostname) DO UPDATE SET
                os = COALESCE(EXCLUDED.os, hosts.os),
                platform = COALESCE(EXCLUDED.platform, hosts.platform),
                last_seen_at = EXCLUDED.last_seen_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(hostname)
        .bind(os)
        .bind(platform)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn touch_host(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE hosts SET last_seen_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert_agent(
        &self,
        host_id: Uuid,
        version: Option<&str>,
        status: AgentStatus,
        pid: Option<i32>,
    ) -> Result<Agent> {
        let row = sqlx::query_as::<_, AgentRow>(
            r#"
            INSERT INTO agents (id, host_id, version, status, pid, last_heartbeat_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (host_id) DO UPDATE SET
                version = COALESCE(EXCLUDED.version, agents.version),
                status = EXCLUDED.status,
                pid = COALESCE(EXCLUDED.pid, agents.pid),
                last_heartbeat_at = EXCLUDED.last_heartbeat_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(host_id)
        .bind(version)
        .bind(status.as_str())
        .bind(pid)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}

// Database row types for mapping

#[derive(sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    slug: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: row.id,
            slug: row.slug,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct HostRow {
    id: Uuid,
    tenant_id: Uuid,
    hostname: String,
    os: Option<String>,
    platform: Option<String>,
    created_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

impl From<HostRow> for Host {
    fn from(row: HostRow) -> Self {
        Host {
            id: row.id,
            tenant_id: row.tenant_id,
            hostname: row.hostname,
            os: row.os,
            platform: row.platform,
            created_at: row.created_at,
            last_seen_at: row.last_seen_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: Uuid,
    host_id: Uuid,
    version: Option<String>,
    status: String,
    pid: Option<i32>,
    last_heartbeat_at: DateTime<Utc>,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        Agent {
            id: row.id,
            host_id: row.host_id,
            version: row.version,
            status: AgentStatus::parse(&row.status),
            pid: row.pid,
            last_heartbeat_at: row.last_heartbeat_at,
        }
    }
}
