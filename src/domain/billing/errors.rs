//! Error types for webhook processing and billing session flows.

use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur while processing a webhook delivery.
///
/// Attribution failures (stale subscription ids, missing metadata) are not
/// errors: handlers report those as skipped outcomes so the provider does not
/// retry them forever.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Request body is not a valid event envelope.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Database operation failed while applying the event.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}

/// Errors raised by checkout, portal, and subscription-management flows.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Requested plan is not in the pricing table.
    #[error("Invalid plan type: {0}")]
    InvalidPlan(String),

    /// User has no billing customer at the provider yet.
    #[error("No billing customer found")]
    NoBillingCustomer,

    /// Action requires a subscription the user does not have.
    #[error("No subscription found")]
    NoSubscription,

    /// Subscription record for the user does not exist.
    #[error("Subscription record not found")]
    RecordNotFound,

    /// Provider call failed.
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// Database or other infrastructure failure.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        BillingError::Infrastructure(err.to_string())
    }
}
