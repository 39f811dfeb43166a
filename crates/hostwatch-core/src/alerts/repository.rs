//! Postgres-backed alert storage

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Alert, AlertRule, AlertStatus, Condition, MetricType, Severity};

use super::AlertStore;

/// Repository for alert rules, alerts, and the notification queue
#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    /// Create a new alert repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_alert(&self, id: Uuid) -> Result<Alert> {
        let row = sqlx::query_as::<_, AlertRow>("SELECT * FROM alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Into::into)
            .ok_or_else(|| Error::not_found("Alert", id.to_string()))
    }
}

#[async_trait::async_trait]
impl AlertStore for AlertRepository {
    async fn enabled_rules(&self, tenant_id: Uuid) -> Result<Vec<AlertRule>> {
        let rows = sqlx::query_as::<_, AlertRuleRow>(
            r#"
            SELECT * FROM alert_rules
            WHERE tenant_id = $1 AND enabled = true
            ORDER BY created_at ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn open_alerts(&self, tenant_id: Uuid) -> Result<Vec<Alert>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT * FROM alerts
            WHERE tenant_id = $1 AND status IN ('active', 'acknowledged')
            ORDER BY triggered_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO alerts (
                id, rule_id, host_id, tenant_id, severity, status,
                metric_value, message, triggered_at, resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(alert.id)
        .bind(alert.rule_id)
        .bind(alert.host_id)
        .bind(alert.tenant_id)
        .bind(alert.severity.as_str())
        .bind(alert.status.as_str())
        .bind(alert.metric_value)
        .bind(&alert.message)
        .bind(alert.triggered_at)
        .bind(alert.resolved_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn queue_notification(&self, alert: &Alert) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_queue (id, alert_id, severity, message, queued_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(alert.id)
        .bind(alert.severity.as_str())
        .bind(&alert.message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_alert(&self, id: Uuid) -> Result<Option<Alert>> {
        let row = sqlx::query_as::<_, AlertRow>("SELECT * FROM alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_alerts(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<Alert>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT * FROM alerts
            WHERE tenant_id = $1
            ORDER BY triggered_at DESC
            LIMIT $2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn acknowledge_alert(&self, id: Uuid) -> Result<Alert> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'acknowledged' WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish missing from wrong-state for the API layer.
            let current = self.get_alert(id).await?;
            return match current {
                Some(alert) => Err(Error::InvalidState(format!(
                    "Alert {} is {}, only active alerts can be acknowledged",
                    id,
                    alert.status.as_str()
                ))),
                None => Err(Error::not_found("Alert", id.to_string())),
            };
        }

        self.fetch_alert(id).await
    }

    async fn resolve_alert(&self, id: Uuid) -> Result<Alert> {
        let result = sqlx::query(
            r#"
            UPDATE alerts
            SET status = 'resolved', resolved_at = $2
            WHERE id = $1 AND status IN ('active', 'acknowledged')
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_alert(id).await?;
            return match current {
                Some(_) => Err(Error::InvalidState(format!(
                    "Alert {} is already resolved",
                    id
                ))),
                None => Err(Error::not_found("Alert", id.to_string())),
            };
        }

        self.fetch_alert(id).await
    }
}

// Database row types for mapping

#[derive(sqlx::FromRow)]
struct AlertRuleRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    metric_type: String,
    condition: String,
    threshold: i64,
    severity: String,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AlertRuleRow> for AlertRule {
    fn from(row: AlertRuleRow) -> Self {
        AlertRule {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            metric_type: MetricType::parse(&row.metric_type).unwrap_or(MetricType::Cpu),
            condition: Condition::parse(&row.condition).unwrap_or(Condition::Gt),
            threshold: row.threshold,
            severity: Severity::parse(&row.severity).unwrap_or_default(),
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    rule_id: Uuid,
    host_id: Uuid,
    tenant_id: Uuid,
    severity: String,
    status: String,
    metric_value: i64,
    message: String,
    triggered_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl From<AlertRow> for Alert {
    fn from(row: AlertRow) -> Self {
        Alert {
            id: row.id,
            rule_id: row.rule_id,
            host_id: row.host_id,
            tenant_id: row.tenant_id,
            severity: Severity::parse(&row.severity).unwrap_or_default(),
            status: AlertStatus::parse(&row.status).unwrap_or_default(),
            metric_value: row.metric_value,
            message: row.message,
            triggered_at: row.triggered_at,
            resolved_at: row.resolved_at,
        }
    }
}
