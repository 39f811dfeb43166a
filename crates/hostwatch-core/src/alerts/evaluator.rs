//! Threshold rule evaluation
//!
//! Runs inline on the heartbeat path. Rules and open alerts are fetched
//! once per heartbeat, not per rule; the open-alert snapshot is also the
//! duplicate-suppression check, so at most one open alert exists per
//! `(rule, host)` pair as seen by this process.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Alert, AlertRule, AlertStatus, HostMetrics};

use super::notifier::Notifier;
use super::AlertStore;

/// Evaluates a tenant's rules against incoming samples
pub struct AlertEvaluator {
    store: Arc<dyn AlertStore>,
    notifier: Notifier,
}

impl AlertEvaluator {
    /// Create an evaluator over an alert store
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        let notifier = Notifier::new(Arc::clone(&store));
        Self { store, notifier }
    }

    /// Evaluate one heartbeat's sample against the tenant's enabled rules.
    ///
    /// Returns the alerts opened. Errors fetching rules or open alerts
    /// propagate (the caller logs and drops them); a failure while opening
    /// one alert is logged and does not stop the remaining rules.
    pub async fn evaluate(
        &self,
        tenant_id: Uuid,
        host_id: Uuid,
        sample: &HostMetrics,
        agent_running: bool,
    ) -> Result<Vec<Alert>> {
        let rules = self.store.enabled_rules(tenant_id).await?;
        if rules.is_empty() {
            return Ok(Vec::new());
        }
        let open = self.store.open_alerts(tenant_id).await?;

        debug!(
            %tenant_id,
            %host_id,
            rules = rules.len(),
            open_alerts = open.len(),
            "Evaluating heartbeat"
        );

        let mut opened = Vec::new();
        for rule in &rules {
            let Some(alert) = build_alert(rule, host_id, sample, agent_running, &open) else {
                continue;
            };

            match self.open_alert(&alert).await {
                Ok(()) => {
                    info!(
                        rule_id = %rule.id,
                        %host_id,
                        severity = alert.severity.as_str(),
                        value = alert.metric_value,
                        "Alert triggered"
                    );
                    opened.push(alert);
                }
                Err(e) => {
                    error!(rule_id = %rule.id, %host_id, error = %e, "Failed to open alert");
                }
            }
        }

        Ok(opened)
    }

    async fn open_alert(&self, alert: &Alert) -> Result<()> {
        self.store.insert_alert(alert).await?;
        self.notifier.enqueue(alert).await;
        Ok(())
    }
}

/// Decide whether `rule` fires for `sample`, honoring duplicate suppression
/// against the pre-fetched open-alert snapshot.
fn build_alert(
    rule: &AlertRule,
    host_id: Uuid,
    sample: &HostMetrics,
    agent_running: bool,
    open: &[Alert],
) -> Option<Alert> {
    let raw = rule.metric_type.extract(sample, agent_running);
    // Integer-threshold semantics: round first, then compare.
    let value = raw.round() as i64;

    if !rule.condition.check(value, rule.threshold) {
        return None;
    }

    let duplicate = open
        .iter()
        .any(|a| a.rule_id == rule.id && a.host_id == host_id && a.is_open());
    if duplicate {
        debug!(rule_id = %rule.id, %host_id, "Open alert exists, suppressing duplicate");
        return None;
    }

    Some(Alert {
        id: Uuid::new_v4(),
        rule_id: rule.id,
        host_id,
        tenant_id: rule.tenant_id,
        severity: rule.severity,
        status: AlertStatus::Active,
        metric_value: value,
        message: format_message(rule, value),
        triggered_at: Utc::now(),
        resolved_at: None,
    })
}

fn format_message(rule: &AlertRule, value: i64) -> String {
    format!(
        "{} {} threshold of {} (current value: {})",
        rule.metric_type.as_str(),
        rule.condition.verb(),
        rule.threshold,
        value
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, MetricType, Severity};
    use crate::testutil::{cpu_sample, rule_with, MemoryRegistry};

    fn open_alert_for(rule: &AlertRule, host_id: Uuid) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            rule_id: rule.id,
            host_id,
            tenant_id: rule.tenant_id,
            severity: rule.severity,
            status: AlertStatus::Active,
            metric_value: 95,
            message: String::new(),
            triggered_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_build_alert_fires_above_threshold() {
        let rule = rule_with(MetricType::Cpu, Condition::Gt, 80, Severity::Critical);
        let host_id = Uuid::new_v4();
        let sample = cpu_sample("h1", 1000, 85.0);

        let alert = build_alert(&rule, host_id, &sample, true, &[]).unwrap();
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.metric_value, 85);
        assert_eq!(alert.message, "cpu exceeded threshold of 80 (current value: 85)");
    }

    #[test]
    fn test_build_alert_quiet_below_threshold() {
        let rule = rule_with(MetricType::Cpu, Condition::Gt, 80, Severity::Warning);
        let sample = cpu_sample("h1", 1000, 75.0);
        assert!(build_alert(&rule, Uuid::new_v4(), &sample, true, &[]).is_none());
    }

    #[test]
    fn test_round_then_compare() {
        let rule = rule_with(MetricType::Cpu, Condition::Gt, 80, Severity::Warning);
        let host_id = Uuid::new_v4();

        // 80.4 rounds to 80, not greater than 80.
        assert!(build_alert(&rule, host_id, &cpu_sample("h1", 0, 80.4), true, &[]).is_none());
        // 80.5 rounds to 81 and fires.
        let alert = build_alert(&rule, host_id, &cpu_sample("h1", 0, 80.5), true, &[]).unwrap();
        assert_eq!(alert.metric_value, 81);
    }

    #[test]
    fn test_duplicate_suppressed_for_same_rule_host() {
        let rule = rule_with(MetricType::Cpu, Condition::Gt, 80, Severity::Warning);
        let host_id = Uuid::new_v4();
        let sample = cpu_sample("h1", 1000, 90.0);

        let existing = open_alert_for(&rule, host_id);
        assert!(build_alert(&rule, host_id, &sample, true, &[existing.clone()]).is_none());

        // An acknowledged alert still suppresses.
        let mut acked = existing.clone();
        acked.status = AlertStatus::Acknowledged;
        assert!(build_alert(&rule, host_id, &sample, true, &[acked]).is_none());

        // A resolved one does not.
        let mut resolved = existing.clone();
        resolved.status = AlertStatus::Resolved;
        assert!(build_alert(&rule, host_id, &sample, true, &[resolved]).is_some());

        // Nor does an open alert for a different host.
        let other_host = open_alert_for(&rule, Uuid::new_v4());
        assert!(build_alert(&rule, host_id, &sample, true, &[other_host]).is_some());
    }

    #[test]
    fn test_agent_status_rule() {
        let rule = rule_with(MetricType::AgentStatus, Condition::Eq, 0, Severity::Critical);
        let sample = cpu_sample("h1", 1000, 10.0);

        assert!(build_alert(&rule, Uuid::new_v4(), &sample, true, &[]).is_none());
        let alert = build_alert(&rule, Uuid::new_v4(), &sample, false, &[]).unwrap();
        assert_eq!(alert.metric_value, 0);
    }

    #[tokio::test]
    async fn test_evaluate_persists_once_and_suppresses_second() {
        let registry = Arc::new(MemoryRegistry::new());
        let tenant = registry.add_tenant("acme");
        let rule = rule_with(MetricType::Cpu, Condition::Gt, 80, Severity::Critical);
        let mut rule = rule;
        rule.tenant_id = tenant.id;
        registry.add_rule(rule.clone());

        let evaluator = AlertEvaluator::new(registry.clone());
        let host_id = Uuid::new_v4();
        let sample = cpu_sample(&host_id.to_string(), 1000, 85.0);

        let first = evaluator
            .evaluate(tenant.id, host_id, &sample, true)
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        // Same breach on the next heartbeat: duplicate suppressed.
        let second = evaluator
            .evaluate(tenant.id, host_id, &sample, true)
            .await
            .unwrap();
        assert!(second.is_empty());

        let open = registry.open_alerts(tenant.id).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].metric_value, 85);
        assert_eq!(registry.queued_notifications(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_skips_disabled_rules() {
        let registry = Arc::new(MemoryRegistry::new());
        let tenant = registry.add_tenant("acme");
        let mut rule = rule_with(MetricType::Cpu, Condition::Gt, 80, Severity::Info);
        rule.tenant_id = tenant.id;
        rule.enabled = false;
        registry.add_rule(rule);

        let evaluator = AlertEvaluator::new(registry.clone());
        let opened = evaluator
            .evaluate(tenant.id, Uuid::new_v4(), &cpu_sample("h1", 0, 99.0), true)
            .await
            .unwrap();
        assert!(opened.is_empty());
    }
}
