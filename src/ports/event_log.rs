//! SubscriptionEventLog port - append-only audit trail of webhook events.
//!
//! Every received event is recorded, including unknown types and events the
//! handlers skipped. Rows are never updated; they are deleted only as part
//! of full account deletion.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp, UserId};

/// One audit row per received webhook event.
#[derive(Debug, Clone)]
pub struct SubscriptionEventRecord {
    /// Provider-assigned event id, used for dedup during inspection.
    pub event_id: String,

    /// Best-effort resolved user; `None` when the event could not be
    /// attributed.
    pub user_id: Option<UserId>,

    /// Subscription the event refers to, when one could be extracted.
    pub subscription_id: Option<String>,

    /// Provider event type string, stored verbatim (including types this
    /// service does not handle).
    pub event_type: String,

    /// Full event payload for later inspection.
    pub payload: serde_json::Value,

    /// When this service received the event.
    pub received_at: Timestamp,
}

/// Port for the append-only subscription event log.
#[async_trait]
pub trait SubscriptionEventLog: Send + Sync {
    /// Appends one record.
    async fn append(&self, record: SubscriptionEventRecord) -> Result<(), DomainError>;

    /// Deletes all records for a user. Returns the number of rows removed.
    ///
    /// Only invoked by the account deletion cascade.
    async fn delete_for_user(&self, user_id: &UserId) -> Result<u64, DomainError>;
}
