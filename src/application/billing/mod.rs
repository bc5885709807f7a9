//! Billing use cases: webhook processing, checkout, subscription management.

mod create_checkout;
mod manage_subscription;
mod process_webhook;

pub use create_checkout::{CreateCheckoutCommand, CreateCheckoutHandler, CreateCheckoutResult};
pub use manage_subscription::{
    ManageAction, ManageSubscriptionCommand, ManageSubscriptionHandler, ManageSubscriptionResult,
};
pub use process_webhook::{ProcessWebhookCommand, ProcessWebhookError, ProcessWebhookHandler};
