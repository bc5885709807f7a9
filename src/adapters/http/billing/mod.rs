//! Billing HTTP module: checkout, subscription management, webhooks.

mod dto;
mod handlers;
mod routes;

pub use handlers::BillingAppState;
pub use routes::{billing_routes, webhook_routes};
