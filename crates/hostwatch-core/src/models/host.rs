//! Tenant, host, and agent records
//!
//! These rows are owned by the relational registry; the surrounding CRUD
//! layer manages tenants, while hosts and agents are upserted from the
//! heartbeat path on first sight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant (organization) that registers hosts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique identifier
    pub id: Uuid,
    /// URL-safe identifier used by the v2 heartbeat
    pub slug: String,
    /// Display name
    pub name: String,
    /// When the tenant was created
    pub created_at: DateTime<Utc>,
}

/// A monitored host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    /// Unique identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: Uuid,
    /// Hostname, unique within the tenant
    pub hostname: String,
    /// Operating system reported by the agent
    pub os: Option<String>,
    /// Platform/architecture reported by the agent
    pub platform: Option<String>,
    /// When the host was first seen
    pub created_at: DateTime<Utc>,
    /// Last heartbeat time
    pub last_seen_at: DateTime<Utc>,
}

/// Agent run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Agent is reporting
    #[default]
    Running,
    /// Agent reported itself stopped
    Stopped,
}

impl AgentStatus {
    /// Lowercase string form used in the database
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Running => "running",
            AgentStatus::Stopped => "stopped",
        }
    }

    /// Parse a wire/database value; anything other than "running" is stopped
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("running") {
            AgentStatus::Running
        } else {
            AgentStatus::Stopped
        }
    }

    /// Whether the agent is running
    pub fn is_running(self) -> bool {
        self == AgentStatus::Running
    }
}

/// The reporting agent installed on a host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier
    pub id: Uuid,
    /// Host the agent reports for (one agent per host)
    pub host_id: Uuid,
    /// Agent software version
    pub version: Option<String>,
    /// Run state from the last heartbeat
    pub status: AgentStatus,
    /// Process id on the host
    pub pid: Option<i32>,
    /// Last heartbeat time
    pub last_heartbeat_at: DateTime<Utc>,
}
