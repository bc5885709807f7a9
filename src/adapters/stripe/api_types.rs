//! Stripe API response types.
//!
//! Shapes returned by the REST endpoints this adapter calls. Only the fields
//! the application reads are captured; the rest of Stripe's schema is
//! ignored by serde.

use serde::Deserialize;
use std::collections::HashMap;

/// Customer object (`/v1/customers`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    /// Customer id (cus_xxx).
    pub id: String,

    /// Customer email address.
    pub email: Option<String>,

    /// Custom metadata; carries the application user id.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Whether the customer has been deleted.
    #[serde(default)]
    pub deleted: bool,
}

/// Subscription object (`/v1/subscriptions`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    /// Subscription id (sub_xxx).
    pub id: String,

    /// Provider status string.
    pub status: String,

    /// Whether the subscription cancels at period end.
    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// Current period end, Unix seconds.
    pub current_period_end: Option<i64>,
}

/// Checkout session object (`/v1/checkout/sessions`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    /// Session id (cs_xxx).
    pub id: String,

    /// Hosted checkout URL; present on freshly created sessions.
    pub url: Option<String>,
}

/// Billing portal session object (`/v1/billing_portal/sessions`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripePortalSession {
    /// Portal session id (bps_xxx).
    pub id: String,

    /// Hosted portal URL.
    pub url: String,
}

/// Deletion confirmation (`DELETE /v1/customers/{id}`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeDeleted {
    pub id: String,

    #[serde(default)]
    pub deleted: bool,
}
