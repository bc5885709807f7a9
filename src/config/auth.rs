//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Authentication configuration for the managed auth service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the auth service (e.g. https://<project>.supabase.co/auth/v1)
    pub base_url: String,

    /// Project JWT secret for validating access tokens
    pub jwt_secret: String,

    /// Service-role key for admin operations (identity deletion)
    pub service_role_key: String,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// In production, requires HTTPS for the auth service URL.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_BASE_URL"));
        }
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_JWT_SECRET"));
        }
        if self.service_role_key.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_SERVICE_ROLE_KEY"));
        }

        if *environment == Environment::Production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::AuthUrlMustBeHttps);
        }

        Ok(())
    }
}
