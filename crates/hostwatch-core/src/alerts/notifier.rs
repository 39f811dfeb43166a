//! Notification hand-off
//!
//! Delivery (email, webhooks, paging) is handled outside this service. The
//! notifier's whole job is to record the obligation so a dispatcher can pick
//! it up later; a failure to queue never fails the alert that was already
//! persisted.

use std::sync::Arc;

use tracing::{info, warn};

use crate::models::Alert;

use super::AlertStore;

/// Queues notification rows for freshly opened alerts
pub struct Notifier {
    store: Arc<dyn AlertStore>,
}

impl Notifier {
    /// Create a notifier backed by `store`
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self { store }
    }

    /// Queue a notification for an alert. Best effort: a queue failure is
    /// logged, not propagated.
    pub async fn enqueue(&self, alert: &Alert) {
        match self.store.queue_notification(alert).await {
            Ok(()) => {
                info!(
                    alert_id = %alert.id,
                    severity = alert.severity.as_str(),
                    "Notification queued"
                );
            }
            Err(e) => {
                warn!(alert_id = %alert.id, error = %e, "Failed to queue notification");
            }
        }
    }
}
