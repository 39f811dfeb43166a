//! Threshold alerting
//!
//! The evaluator consumes one normalized sample per heartbeat, checks it
//! against the tenant's enabled rules, and opens alerts with
//! duplicate-suppression per `(rule, host)`. Alert rows live behind the
//! [`AlertStore`] trait; [`AlertRepository`] is the Postgres implementation.

mod evaluator;
mod notifier;
mod repository;

pub use evaluator::AlertEvaluator;
pub use notifier::Notifier;
pub use repository::AlertRepository;

use uuid::Uuid;

use crate::error::Result;
use crate::models::{Alert, AlertRule};

/// Persistence seam for rules and alerts
///
/// Rule rows are written by the surrounding CRUD layer; the core reads
/// enabled rules and owns the alert lifecycle rows.
#[async_trait::async_trait]
pub trait AlertStore: Send + Sync {
    /// Enabled rules for a tenant
    async fn enabled_rules(&self, tenant_id: Uuid) -> Result<Vec<AlertRule>>;

    /// Alerts for a tenant that are still open (`active` or `acknowledged`)
    async fn open_alerts(&self, tenant_id: Uuid) -> Result<Vec<Alert>>;

    /// Persist a freshly opened alert
    async fn insert_alert(&self, alert: &Alert) -> Result<()>;

    /// Record a queued notification obligation for an alert.
    ///
    /// Delivery is out of scope; the row is the hand-off point for whatever
    /// dispatcher the surrounding system runs.
    async fn queue_notification(&self, alert: &Alert) -> Result<()>;

    /// Fetch a single alert
    async fn get_alert(&self, id: Uuid) -> Result<Option<Alert>>;

    /// Recent alerts for a tenant, newest-first
    async fn list_alerts(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<Alert>>;

    /// `active → acknowledged`; fails on any other starting state
    async fn acknowledge_alert(&self, id: Uuid) -> Result<Alert>;

    /// `active|acknowledged → resolved`; fails if already resolved
    async fn resolve_alert(&self, id: Uuid) -> Result<Alert>;
}
