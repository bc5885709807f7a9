//! HTTP DTOs for the account endpoints.

use serde::Serialize;

/// Response for a completed account deletion.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
}

/// Error body for account endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AccountErrorResponse {
    pub success: bool,
    pub error: String,
}

impl AccountErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_shape() {
        let response = DeleteAccountResponse {
            success: true,
            message: "Account deleted successfully".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Account deleted successfully");
    }

    #[test]
    fn error_response_carries_success_false() {
        let json = serde_json::to_value(AccountErrorResponse::new("blocked")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "blocked");
    }
}
