//! Axum router configuration for billing endpoints.

use axum::{routing::post, Router};

use super::handlers::{create_checkout, handle_stripe_webhook, manage_subscription, BillingAppState};

/// Authenticated billing endpoints.
///
/// - `POST /checkout` - start a subscription checkout
/// - `POST /manage` - cancel, reactivate, or open the billing portal
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/manage", post(manage_subscription))
}

/// Webhook endpoints.
///
/// Separate from the billing routes because webhooks carry no user
/// authentication; they are verified by signature.
///
/// - `POST /stripe` - provider webhook deliveries
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}
