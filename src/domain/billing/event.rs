//! Provider webhook event envelope and payload views.
//!
//! The envelope carries a polymorphic `data.object`; handlers deserialize it
//! lazily into the view they need. Only fields relevant to reconciliation are
//! captured; everything else in the provider's schema is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::WebhookError;

/// Webhook event envelope as delivered by the billing provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingEvent {
    /// Provider-assigned event id (evt_xxx), used for audit dedup.
    pub id: String,

    /// Event type string (e.g. "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the provider created the event.
    pub created: i64,

    /// Event payload containing the affected object.
    pub data: BillingEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,

    /// Provider API version used to render this event.
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    /// Previous values for updated attributes (only for update events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl BillingEvent {
    /// Parses a verified raw body into an event envelope.
    pub fn from_slice(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::MalformedEvent(e.to_string()))
    }

    /// Parses the event type into a known enum variant.
    pub fn parsed_type(&self) -> BillingEventType {
        BillingEventType::from_str(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified view.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, WebhookError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| WebhookError::MalformedEvent(e.to_string()))
    }

    /// Best-effort `user_id` from the object's metadata, if present.
    pub fn metadata_user_id(&self) -> Option<String> {
        self.data
            .object
            .get("metadata")
            .and_then(|m| m.get("user_id"))
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    }

    /// Best-effort subscription id from the object.
    ///
    /// Invoices and checkout sessions reference it via a `subscription`
    /// field; subscription objects are themselves identified by it.
    pub fn object_subscription_id(&self) -> Option<String> {
        let object = &self.data.object;
        if let Some(id) = object.get("subscription").and_then(|v| v.as_str()) {
            return Some(id.to_owned());
        }
        if self.event_type.starts_with("customer.subscription.") {
            return object.get("id").and_then(|v| v.as_str()).map(str::to_owned);
        }
        None
    }
}

/// Known provider event types routed to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillingEventType {
    /// Checkout session completed successfully.
    CheckoutSessionCompleted,
    /// Customer subscription was created.
    SubscriptionCreated,
    /// Customer subscription was updated.
    SubscriptionUpdated,
    /// Customer subscription was deleted.
    SubscriptionDeleted,
    /// Invoice payment succeeded.
    InvoicePaymentSucceeded,
    /// Invoice payment failed.
    InvoicePaymentFailed,
    /// Unknown or unhandled event type.
    Unknown,
}

impl BillingEventType {
    /// Parse event type from the provider's string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    /// Convert to the provider's event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Payload Views
// ════════════════════════════════════════════════════════════════════════════════

/// Checkout session object as delivered in `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    /// Session id (cs_xxx).
    pub id: String,

    /// Provider customer id, when one was attached.
    pub customer: Option<String>,

    /// Subscription created by the checkout.
    pub subscription: Option<String>,

    /// Metadata attached when the session was created.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Subscription object as delivered in `customer.subscription.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    /// Subscription id (sub_xxx).
    pub id: String,

    /// Owning provider customer id.
    pub customer: Option<String>,

    /// Provider status string.
    pub status: String,

    /// Current period start, Unix seconds.
    pub current_period_start: Option<i64>,

    /// Current period end, Unix seconds.
    pub current_period_end: Option<i64>,

    /// Whether the subscription is set to cancel at period end.
    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// Metadata propagated from checkout.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Invoice object as delivered in `invoice.payment_*` events.
///
/// Invoices carry no user metadata; attribution goes through the
/// subscription id.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    /// Invoice id (in_xxx).
    pub id: String,

    /// Owning provider customer id.
    pub customer: Option<String>,

    /// Subscription the invoice bills.
    pub subscription: Option<String>,

    /// Amount paid, in cents.
    pub amount_paid: Option<i64>,

    /// Amount due, in cents.
    pub amount_due: Option<i64>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Test Builder
// ════════════════════════════════════════════════════════════════════════════════

/// Builder for creating test BillingEvent instances.
#[cfg(test)]
pub struct BillingEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    livemode: bool,
}

#[cfg(test)]
impl Default for BillingEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: 1704067200,
            object: serde_json::json!({}),
            livemode: false,
        }
    }
}

#[cfg(test)]
impl BillingEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> BillingEvent {
        BillingEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: BillingEventData {
                object: self.object,
                previous_attributes: None,
            },
            livemode: self.livemode,
            api_version: Some("2023-10-16".to_string()),
        }
    }
}
