//! Auth ports: session validation and identity administration.
//!
//! `SessionValidator` is the request-path port - it turns a bearer token into
//! an `AuthenticatedUser`. `IdentityProvider` is the admin-path port used by
//! account deletion to remove the authentication identity itself.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};

/// Validates access tokens on incoming requests.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validates a bearer token and returns the authenticated user.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidToken` / `TokenExpired` - token rejected
    /// - `AuthError::ServiceUnavailable` - transient provider failure
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

/// Administrative operations against the managed identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Deletes the authentication identity for a user.
    ///
    /// This is the final, irreversible step of account deletion: once the
    /// identity is gone the user can no longer sign in.
    async fn delete_user(&self, user_id: &UserId) -> Result<(), AuthError>;
}
