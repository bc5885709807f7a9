//! Stripe payment provider adapter.

mod api_types;
mod gateway;
mod mock_gateway;

pub use gateway::{StripeConfig, StripeGateway};
pub use mock_gateway::MockPaymentGateway;
