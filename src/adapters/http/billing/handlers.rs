//! HTTP handlers for billing endpoints.
//!
//! Connects axum routes to the application layer. The webhook handler is
//! shared state built once at startup (its routing table is immutable);
//! checkout and management handlers are constructed per request from the
//! port handles.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::billing::{
    CreateCheckoutCommand, CreateCheckoutHandler, ManageSubscriptionCommand,
    ManageSubscriptionHandler, ProcessWebhookCommand, ProcessWebhookError, ProcessWebhookHandler,
};
use crate::domain::billing::BillingError;
use crate::ports::{PaymentProvider, SubscriptionStore};

use super::super::middleware::RequireAuth;
use super::dto::{
    CreateCheckoutRequest, CreateCheckoutResponse, ErrorResponse, ManageSubscriptionRequest,
    ManageSubscriptionResponse,
};

/// Shared state for the billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub store: Arc<dyn SubscriptionStore>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub webhook: Arc<ProcessWebhookHandler>,
}

impl BillingAppState {
    fn create_checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(self.store.clone(), self.payment_provider.clone())
    }

    fn manage_subscription_handler(&self) -> ManageSubscriptionHandler {
        ManageSubscriptionHandler::new(self.store.clone(), self.payment_provider.clone())
    }
}

/// POST /api/billing/checkout - create a checkout session
pub async fn create_checkout(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.create_checkout_handler();
    let cmd = CreateCheckoutCommand {
        user_id: user.id,
        email: user.email,
        plan_type: request.plan_type,
        success_url: request.success_url,
        cancel_url: request.cancel_url,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(CreateCheckoutResponse {
        session_id: result.session_id,
        url: result.url,
    }))
}

/// POST /api/billing/manage - cancel, reactivate, or open the portal
pub async fn manage_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<ManageSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.manage_subscription_handler();
    let cmd = ManageSubscriptionCommand {
        user_id: user.id,
        action: request.action,
        return_url: request.return_url,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(ManageSubscriptionResponse {
        success: true,
        message: result.message,
        url: result.url,
        subscription: result.subscription,
    }))
}

/// POST /api/webhooks/stripe - inbound webhook deliveries
///
/// The provider only ever sees 200 (accepted, including no-ops) or 400
/// (rejected outright); any other answer would trigger retry storms.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookApiError::MissingSignature)?;

    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    state.webhook.handle(cmd).await?;

    Ok((StatusCode::OK, "Webhook handled successfully"))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error for authenticated billing endpoints.
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            BillingError::InvalidPlan(_) => StatusCode::BAD_REQUEST,
            BillingError::NoBillingCustomer
            | BillingError::NoSubscription
            | BillingError::RecordNotFound => StatusCode::BAD_REQUEST,
            BillingError::Provider(_) | BillingError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

/// API error for the webhook endpoint. Everything is a 400; the response
/// body is a plain string the provider shows in its delivery log.
pub enum WebhookApiError {
    MissingSignature,
    Processing(ProcessWebhookError),
}

impl From<ProcessWebhookError> for WebhookApiError {
    fn from(err: ProcessWebhookError) -> Self {
        Self::Processing(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let message = match self {
            WebhookApiError::MissingSignature => "No Stripe signature found".to_string(),
            WebhookApiError::Processing(ProcessWebhookError::SignatureRejected) => {
                "Webhook signature verification failed".to_string()
            }
            WebhookApiError::Processing(e) => format!("Webhook error: {}", e),
        };

        (StatusCode::BAD_REQUEST, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_plan_maps_to_bad_request() {
        let response =
            BillingApiError(BillingError::InvalidPlan("gold".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_customer_maps_to_bad_request() {
        let response = BillingApiError(BillingError::NoBillingCustomer).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_failure_maps_to_server_error() {
        let response =
            BillingApiError(BillingError::Provider("boom".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn webhook_errors_all_map_to_bad_request() {
        for err in [
            WebhookApiError::MissingSignature,
            WebhookApiError::Processing(ProcessWebhookError::SignatureRejected),
            WebhookApiError::Processing(ProcessWebhookError::MalformedEvent("x".to_string())),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }
}
