//! Audit recording for received webhook events.
//!
//! Every verified delivery is appended to the subscription event log,
//! including unknown types and events the handlers skipped. Audit failures
//! are swallowed: the provider retries on non-2xx, and a duplicate side
//! effect is worse than a missing audit row.

use std::sync::Arc;

use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{SubscriptionEventLog, SubscriptionEventRecord, SubscriptionStore};

use super::event::BillingEvent;

/// Appends one audit record per received event, resolving the user
/// best-effort.
pub struct EventRecorder {
    log: Arc<dyn SubscriptionEventLog>,
    store: Arc<dyn SubscriptionStore>,
}

impl EventRecorder {
    pub fn new(log: Arc<dyn SubscriptionEventLog>, store: Arc<dyn SubscriptionStore>) -> Self {
        Self { log, store }
    }

    /// Records the event. Never fails; all errors are traced and dropped.
    pub async fn record(&self, event: &BillingEvent) {
        let user_id = self.resolve_user(event).await;
        let subscription_id = event.object_subscription_id();

        let payload = match serde_json::to_value(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(event_id = %event.id, error = %e, "Could not serialize event for audit");
                serde_json::Value::Null
            }
        };

        let record = SubscriptionEventRecord {
            event_id: event.id.clone(),
            user_id,
            subscription_id,
            event_type: event.event_type.clone(),
            payload,
            received_at: Timestamp::now(),
        };

        if let Err(e) = self.log.append(record).await {
            tracing::warn!(
                event_id = %event.id,
                error = %e,
                "Failed to append subscription event audit record"
            );
        }
    }

    /// Resolution order: object metadata, then lookup by the event's
    /// subscription id. Unresolvable events are logged with no user.
    async fn resolve_user(&self, event: &BillingEvent) -> Option<UserId> {
        if let Some(raw) = event.metadata_user_id() {
            if let Ok(user_id) = UserId::new(raw) {
                return Some(user_id);
            }
        }

        let subscription_id = event.object_subscription_id()?;
        match self.store.find_by_subscription_id(&subscription_id).await {
            Ok(record) => record.map(|r| r.user_id),
            Err(e) => {
                tracing::warn!(
                    subscription_id = %subscription_id,
                    error = %e,
                    "User resolution lookup failed while recording event"
                );
                None
            }
        }
    }
}
