//! HTTP DTOs for the billing endpoints.
//!
//! Request and response JSON uses camelCase to match the mobile and web
//! clients' wire format.

use serde::{Deserialize, Serialize};

use crate::application::billing::ManageAction;
use crate::ports::ProviderSubscription;

/// Request to create a checkout session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    /// Plan to purchase; validated server-side against the pricing table.
    pub plan_type: String,
    /// Redirect after successful checkout.
    pub success_url: String,
    /// Redirect after abandoned checkout.
    pub cancel_url: String,
}

/// Response with the session for client-side redirect.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    pub session_id: String,
    pub url: String,
}

/// Request to manage the caller's subscription.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageSubscriptionRequest {
    pub action: ManageAction,
    #[serde(default)]
    pub return_url: Option<String>,
}

/// Response from a management action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageSubscriptionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<ProviderSubscription>,
}

/// Error body for billing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_request_parses_camel_case() {
        let json = r#"{
            "planType": "steady",
            "successUrl": "https://app.example.com/ok",
            "cancelUrl": "https://app.example.com/back"
        }"#;

        let request: CreateCheckoutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.plan_type, "steady");
        assert_eq!(request.success_url, "https://app.example.com/ok");
    }

    #[test]
    fn checkout_response_serializes_camel_case() {
        let response = CreateCheckoutResponse {
            session_id: "cs_1".to_string(),
            url: "https://checkout.stripe.com/cs_1".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["sessionId"], "cs_1");
        assert!(json.get("session_id").is_none());
    }

    #[test]
    fn manage_request_action_parses() {
        let json = r#"{"action": "get_portal_url", "returnUrl": "https://app.example.com"}"#;
        let request: ManageSubscriptionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.action, ManageAction::GetPortalUrl);
        assert!(request.return_url.is_some());

        let json = r#"{"action": "cancel"}"#;
        let request: ManageSubscriptionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.action, ManageAction::Cancel);
        assert!(request.return_url.is_none());
    }

    #[test]
    fn manage_response_omits_absent_fields() {
        let response = ManageSubscriptionResponse {
            success: true,
            message: None,
            url: Some("https://billing.stripe.com/x".to_string()),
            subscription: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("message").is_none());
        assert!(json.get("subscription").is_none());
    }
}
