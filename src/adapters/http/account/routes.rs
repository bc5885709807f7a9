//! Axum router configuration for account endpoints.

use axum::{routing::post, Router};

use super::handlers::{delete_account, AccountAppState};

/// Authenticated account endpoints.
///
/// - `POST /delete` - delete the caller's account (blocked while a
///   subscription is active)
pub fn account_routes() -> Router<AccountAppState> {
    Router::new().route("/delete", post(delete_account))
}
