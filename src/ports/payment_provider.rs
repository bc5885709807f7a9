//! Payment provider port for external billing operations.
//!
//! Defines the outbound contract toward the payment gateway: customer
//! management, checkout and billing-portal sessions, and subscription
//! cancellation flags. Webhook verification is not part of this port; the
//! inbound path has its own verifier because it must work on the exact raw
//! request bytes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::PlanType;
use crate::domain::foundation::UserId;

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a customer at the provider.
    ///
    /// The application user id is attached as customer metadata so that
    /// provider-side records can be traced back to a user.
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<CustomerResponse, PaymentError>;

    /// Creates a subscription-mode checkout session.
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSessionResponse, PaymentError>;

    /// Sets or clears the cancel-at-period-end flag on a subscription.
    ///
    /// Cancelling this way never revokes access immediately; the
    /// subscription stays active until the period ends.
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<ProviderSubscription, PaymentError>;

    /// Creates a self-service billing portal session.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSessionResponse, PaymentError>;

    /// Deletes a customer at the provider.
    ///
    /// Used only during account deletion; callers treat failures as
    /// best-effort.
    async fn delete_customer(&self, customer_id: &str) -> Result<(), PaymentError>;
}

/// Request to create a provider customer.
#[derive(Debug, Clone)]
pub struct CreateCustomerRequest {
    /// Application user id, stored as customer metadata.
    pub user_id: UserId,

    /// Customer email address.
    pub email: String,
}

/// Customer as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerResponse {
    /// Provider customer id (cus_xxx).
    pub id: String,

    /// Customer email.
    pub email: Option<String>,
}

/// Request to create a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Provider customer the session belongs to.
    pub customer_id: String,

    /// Plan being purchased; line items derive from its pricing entry.
    pub plan_type: PlanType,

    /// Application user id, attached as metadata on the session and on the
    /// resulting subscription - the only channel the webhook path has to
    /// attribute events to a user.
    pub user_id: UserId,

    /// Redirect after successful checkout.
    pub success_url: String,

    /// Redirect after abandoned checkout.
    pub cancel_url: String,
}

/// Checkout session returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSessionResponse {
    /// Provider session id (cs_xxx).
    pub id: String,

    /// Hosted checkout URL for client-side redirect.
    pub url: String,
}

/// Billing portal session returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSessionResponse {
    /// Provider session id.
    pub id: String,

    /// Hosted portal URL.
    pub url: String,
}

/// Subscription state as reported by the provider on management calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSubscription {
    /// Provider subscription id (sub_xxx).
    pub id: String,

    /// Provider status string.
    pub status: String,

    /// Whether the subscription cancels at period end.
    pub cancel_at_period_end: bool,

    /// Current period end, Unix seconds.
    pub current_period_end: Option<i64>,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PaymentError {
    /// Network connectivity issue reaching the provider.
    #[error("Network error: {0}")]
    Network(String),

    /// Provider rejected the API credentials.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Requested resource does not exist at the provider.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Provider returned an API-level error.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl PaymentError {
    /// Returns true if the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, PaymentError::Network(_))
    }
}
