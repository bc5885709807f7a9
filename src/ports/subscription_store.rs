//! SubscriptionStore port - durable subscription state per user.
//!
//! The store holds one `SubscriptionRecord` per user, addressable by user id
//! or by provider subscription id (webhook events do not always carry user
//! context). All writes are narrow-field patches so that re-delivered and
//! out-of-order events are safe to apply.

use async_trait::async_trait;

use crate::domain::billing::{RecordKey, SubscriptionPatch, SubscriptionRecord};
use crate::domain::foundation::{DomainError, UserId};

/// Outcome of applying a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A record matched the key and was updated.
    Applied,
    /// No record matched the key; nothing was written.
    NoMatch,
}

/// Port for reading and patching user subscription records.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Finds the record for a user.
    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Finds the record whose current subscription id matches.
    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Applies a narrow-field patch to the record matching `key`.
    ///
    /// Must be idempotent: applying the same patch twice leaves the record
    /// in the same state. A missing record is reported as `NoMatch`, never
    /// as an error.
    async fn apply(
        &self,
        key: &RecordKey,
        patch: SubscriptionPatch,
    ) -> Result<ApplyOutcome, DomainError>;

    /// Persists the billing customer id for a user, set-once.
    ///
    /// If a customer id is already present the call is a no-op; the first
    /// persisted id wins. Implementations should enforce this atomically
    /// (e.g. `WHERE billing_customer_id IS NULL`).
    async fn set_billing_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError>;
}
