//! Alert data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metrics::HostMetrics;

/// Which metric a rule watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// CPU utilization percentage
    Cpu,
    /// Memory utilization percentage
    Memory,
    /// Disk utilization percentage
    Disk,
    /// Agent run state (1 = running, 0 = stopped)
    AgentStatus,
}

impl MetricType {
    /// Lowercase string form used in the database
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Cpu => "cpu",
            MetricType::Memory => "memory",
            MetricType::Disk => "disk",
            MetricType::AgentStatus => "agent_status",
        }
    }

    /// Parse a database value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cpu" => Some(MetricType::Cpu),
            "memory" => Some(MetricType::Memory),
            "disk" => Some(MetricType::Disk),
            "agent_status" => Some(MetricType::AgentStatus),
            _ => None,
        }
    }

    /// Extract this metric's value from a sample.
    ///
    /// `agent_running` stands in for the `agent_status` pseudo-metric, which
    /// is not part of the sample itself.
    pub fn extract(self, sample: &HostMetrics, agent_running: bool) -> f64 {
        match self {
            MetricType::Cpu => sample.cpu.usage_percent,
            MetricType::Memory => sample.memory.usage_percent,
            MetricType::Disk => sample.disk.usage_percent,
            MetricType::AgentStatus => {
                if agent_running {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Comparison operator for a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Trigger when value > threshold
    Gt,
    /// Trigger when value < threshold
    Lt,
    /// Trigger when value == threshold
    Eq,
}

impl Condition {
    /// Lowercase string form used in the database
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Gt => "gt",
            Condition::Lt => "lt",
            Condition::Eq => "eq",
        }
    }

    /// Parse a database value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gt" => Some(Condition::Gt),
            "lt" => Some(Condition::Lt),
            "eq" => Some(Condition::Eq),
            _ => None,
        }
    }

    /// Evaluate the condition. Rule semantics assume integer thresholds, so
    /// the metric value is rounded before comparison, not after.
    pub fn check(self, value: i64, threshold: i64) -> bool {
        match self {
            Condition::Gt => value > threshold,
            Condition::Lt => value < threshold,
            Condition::Eq => value == threshold,
        }
    }

    /// Verb used when composing alert messages
    pub fn verb(self) -> &'static str {
        match self {
            Condition::Gt => "exceeded",
            Condition::Lt => "fell below",
            Condition::Eq => "equals",
        }
    }
}

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Warning
    #[default]
    Warning,
    /// Critical
    Critical,
}

impl Severity {
    /// Lowercase string form used in the database
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    /// Parse a database value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "info" => Some(Severity::Info),
            "warning" => Some(Severity::Warning),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

/// Status of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Alert is currently active
    #[default]
    Active,
    /// Alert has been acknowledged by an operator
    Acknowledged,
    /// Alert has been resolved
    Resolved,
}

impl AlertStatus {
    /// Lowercase string form used in the database
    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    /// Parse a database value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(AlertStatus::Active),
            "acknowledged" => Some(AlertStatus::Acknowledged),
            "resolved" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }

    /// Open means not yet resolved (`active` or `acknowledged`)
    pub fn is_open(self) -> bool {
        !matches!(self, AlertStatus::Resolved)
    }
}

/// A tenant-scoped threshold rule
///
/// Rules are created and edited by the surrounding CRUD layer; the core only
/// reads enabled rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique identifier
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: Uuid,
    /// Human-readable name
    pub name: String,
    /// Metric the rule watches
    pub metric_type: MetricType,
    /// Comparison operator
    pub condition: Condition,
    /// Integer threshold the rounded metric value is compared against
    pub threshold: i64,
    /// Severity assigned to alerts this rule opens
    pub severity: Severity,
    /// Whether the rule is evaluated
    pub enabled: bool,
    /// When the rule was created
    pub created_at: DateTime<Utc>,
    /// When the rule was last updated
    pub updated_at: DateTime<Utc>,
}

/// A triggered alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier
    pub id: Uuid,
    /// The rule that opened this alert
    pub rule_id: Uuid,
    /// The host the triggering sample came from
    pub host_id: Uuid,
    /// Owning tenant
    pub tenant_id: Uuid,
    /// Severity copied from the rule at trigger time
    pub severity: Severity,
    /// Lifecycle status
    pub status: AlertStatus,
    /// The metric value that triggered the alert, rounded to an integer
    pub metric_value: i64,
    /// Human-readable message combining metric, value, and threshold
    pub message: String,
    /// When the alert was opened
    pub triggered_at: DateTime<Utc>,
    /// When the alert was resolved, if it has been
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Whether this alert still counts against the one-open-alert invariant
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
