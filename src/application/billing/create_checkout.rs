//! CreateCheckoutHandler - starts a subscription checkout at the provider.
//!
//! Resolves or creates the user's billing customer before creating the
//! session. The customer id is persisted *before* session creation so a
//! retried request reuses it instead of minting a duplicate customer.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PlanType};
use crate::domain::foundation::UserId;
use crate::ports::{
    CheckoutSessionRequest, CreateCustomerRequest, PaymentProvider, SubscriptionStore,
};

/// Command to create a checkout session.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub user_id: UserId,
    pub email: String,
    /// Raw plan type from the request; validated against the pricing table.
    pub plan_type: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Checkout session ready for client-side redirect.
#[derive(Debug, Clone)]
pub struct CreateCheckoutResult {
    pub session_id: String,
    pub url: String,
}

/// Handler for the checkout flow.
pub struct CreateCheckoutHandler {
    store: Arc<dyn SubscriptionStore>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl CreateCheckoutHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>, payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            store,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CreateCheckoutResult, BillingError> {
        // 1. Validate the plan against the pricing table
        let plan_type = PlanType::parse(&cmd.plan_type)
            .ok_or_else(|| BillingError::InvalidPlan(cmd.plan_type.clone()))?;

        // 2. Resolve or create the billing customer
        let record = self
            .store
            .find_by_user_id(&cmd.user_id)
            .await?
            .ok_or(BillingError::RecordNotFound)?;

        let customer_id = match record.billing_customer_id {
            Some(customer_id) => customer_id,
            None => {
                let customer = self
                    .payment_provider
                    .create_customer(CreateCustomerRequest {
                        user_id: cmd.user_id.clone(),
                        email: cmd.email.clone(),
                    })
                    .await
                    .map_err(|e| BillingError::Provider(e.to_string()))?;

                // Persist before creating the session; a retry after this
                // point reuses the customer instead of creating another.
                self.store
                    .set_billing_customer_id(&cmd.user_id, &customer.id)
                    .await?;

                tracing::info!(
                    user_id = %cmd.user_id,
                    customer_id = %customer.id,
                    "Created billing customer"
                );
                customer.id
            }
        };

        // 3. Create the session, attaching attribution metadata
        let session = self
            .payment_provider
            .create_checkout_session(CheckoutSessionRequest {
                customer_id,
                plan_type,
                user_id: cmd.user_id.clone(),
                success_url: cmd.success_url,
                cancel_url: cmd.cancel_url,
            })
            .await
            .map_err(|e| BillingError::Provider(e.to_string()))?;

        tracing::info!(
            user_id = %cmd.user_id,
            session_id = %session.id,
            plan_type = %plan_type,
            "Checkout session created"
        );

        Ok(CreateCheckoutResult {
            session_id: session.id,
            url: session.url,
        })
    }
}
