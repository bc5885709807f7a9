//! Stripe implementation of the `PaymentProvider` port.
//!
//! Talks to the Stripe REST API with form-encoded requests. Checkout line
//! items are built inline from the static plan table (`price_data`), and the
//! application user id rides along as metadata on the session and on the
//! subscription it creates.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::ValidationError;
use crate::ports::{
    CheckoutSessionRequest, CheckoutSessionResponse, CreateCustomerRequest, CustomerResponse,
    PaymentError, PaymentProvider, PortalSessionResponse, ProviderSubscription,
};

use super::api_types::{
    StripeCheckoutSession, StripeCustomer, StripeDeleted, StripePortalSession, StripeSubscription,
};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Stripe API.
    api_base_url: String,
}

impl StripeConfig {
    /// Creates a configuration, failing fast on an empty key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ValidationError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ValidationError::empty_field("stripe_api_key"));
        }
        Ok(Self {
            api_key: SecretString::new(api_key),
            api_base_url: "https://api.stripe.com".to_string(),
        })
    }

    /// Overrides the API base URL (for tests against a local stub).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe payment gateway.
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, PaymentError> {
        let response = self
            .http_client
            .post(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        Self::parse_response(response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PaymentError::Authentication(
                "Stripe rejected the API key".to_string(),
            ));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %error_text, "Stripe API call failed");
            return Err(PaymentError::Provider(error_text));
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("Failed to parse Stripe response: {}", e)))
    }
}

#[async_trait]
impl PaymentProvider for StripeGateway {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<CustomerResponse, PaymentError> {
        let params = vec![
            ("email".to_string(), request.email.clone()),
            ("metadata[user_id]".to_string(), request.user_id.to_string()),
        ];

        let customer: StripeCustomer = self.post_form("/v1/customers", &params).await?;

        Ok(CustomerResponse {
            id: customer.id,
            email: customer.email.or(Some(request.email)),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSessionResponse, PaymentError> {
        let pricing = request.plan_type.pricing();
        let user_id = request.user_id.to_string();
        let plan = request.plan_type.as_str().to_string();

        let params = vec![
            ("customer".to_string(), request.customer_id),
            ("mode".to_string(), "subscription".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                "usd".to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                pricing.name.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][description]".to_string(),
                pricing.description.to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                pricing.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][recurring][interval]".to_string(),
                "month".to_string(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url),
            ("cancel_url".to_string(), request.cancel_url),
            // Session metadata feeds checkout.session.completed attribution
            ("metadata[user_id]".to_string(), user_id.clone()),
            ("metadata[plan_type]".to_string(), plan.clone()),
            // Subscription metadata feeds every later lifecycle event
            (
                "subscription_data[metadata][user_id]".to_string(),
                user_id,
            ),
            (
                "subscription_data[metadata][plan_type]".to_string(),
                plan,
            ),
        ];

        let session: StripeCheckoutSession =
            self.post_form("/v1/checkout/sessions", &params).await?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::Provider("Checkout session has no URL".to_string()))?;

        Ok(CheckoutSessionResponse {
            id: session.id,
            url,
        })
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<ProviderSubscription, PaymentError> {
        let params = vec![(
            "cancel_at_period_end".to_string(),
            cancel.to_string(),
        )];

        let subscription: StripeSubscription = self
            .post_form(&format!("/v1/subscriptions/{}", subscription_id), &params)
            .await?;

        Ok(ProviderSubscription {
            id: subscription.id,
            status: subscription.status,
            cancel_at_period_end: subscription.cancel_at_period_end,
            current_period_end: subscription.current_period_end,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSessionResponse, PaymentError> {
        let params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];

        let portal: StripePortalSession = self
            .post_form("/v1/billing_portal/sessions", &params)
            .await?;

        Ok(PortalSessionResponse {
            id: portal.id,
            url: portal.url,
        })
    }

    async fn delete_customer(&self, customer_id: &str) -> Result<(), PaymentError> {
        let response = self
            .http_client
            .delete(self.url(&format!("/v1/customers/{}", customer_id)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::NotFound("Customer"));
        }

        let deleted: StripeDeleted = Self::parse_response(response).await?;
        tracing::info!(customer_id = %deleted.id, "Deleted billing customer");
        Ok(())
    }
}
