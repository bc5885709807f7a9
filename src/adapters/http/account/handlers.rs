//! HTTP handlers for account endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::application::account::{DeleteAccountCommand, DeleteAccountHandler, DeletionError};
use crate::ports::{
    IdentityProvider, PaymentProvider, SubscriptionEventLog, SubscriptionStore, UserDataStore,
};

use super::super::middleware::RequireAuth;
use super::dto::{AccountErrorResponse, DeleteAccountResponse};

/// Shared state for the account routes.
#[derive(Clone)]
pub struct AccountAppState {
    pub store: Arc<dyn SubscriptionStore>,
    pub event_log: Arc<dyn SubscriptionEventLog>,
    pub user_data: Arc<dyn UserDataStore>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub identity_provider: Arc<dyn IdentityProvider>,
}

impl AccountAppState {
    fn delete_account_handler(&self) -> DeleteAccountHandler {
        DeleteAccountHandler::new(
            self.store.clone(),
            self.event_log.clone(),
            self.user_data.clone(),
            self.payment_provider.clone(),
            self.identity_provider.clone(),
        )
    }
}

/// POST /api/account/delete - delete the caller's account
///
/// On success the client is expected to sign the user out; the auth
/// identity no longer exists.
pub async fn delete_account(
    State(state): State<AccountAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, AccountApiError> {
    let handler = state.delete_account_handler();
    let cmd = DeleteAccountCommand { user_id: user.id };

    handler.handle(cmd).await?;

    Ok(Json(DeleteAccountResponse {
        success: true,
        message: "Account deleted successfully".to_string(),
    }))
}

/// API error for account endpoints.
pub struct AccountApiError(DeletionError);

impl From<DeletionError> for AccountApiError {
    fn from(err: DeletionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AccountApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            // Distinct so the client can direct the user to cancel first
            DeletionError::ActiveSubscription => StatusCode::BAD_REQUEST,
            DeletionError::ProfileLookup(_) => StatusCode::BAD_REQUEST,
            DeletionError::StepFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(AccountErrorResponse::new(self.0.to_string()))).into_response()
    }
}
