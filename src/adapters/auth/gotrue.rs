//! GoTrue adapter for the managed auth service.
//!
//! Implements both auth ports against a GoTrue-compatible auth backend:
//!
//! - `SessionValidator` validates the HS256 access token locally using the
//!   project JWT secret, so the request path never makes a network call.
//! - `IdentityProvider` removes auth identities through the admin REST API
//!   using the service-role key.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId, ValidationError};
use crate::ports::{IdentityProvider, SessionValidator};

/// Audience claim GoTrue sets on user access tokens.
const USER_AUDIENCE: &str = "authenticated";

/// Configuration for the GoTrue adapter.
#[derive(Clone)]
pub struct GoTrueConfig {
    /// Base URL of the auth service (e.g. `https://<project>.supabase.co/auth/v1`).
    base_url: String,

    /// Project JWT secret for local token validation.
    jwt_secret: SecretString,

    /// Service-role key for admin operations.
    service_role_key: SecretString,
}

impl GoTrueConfig {
    /// Creates a configuration, failing fast on missing values.
    pub fn new(
        base_url: impl Into<String>,
        jwt_secret: impl Into<String>,
        service_role_key: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let base_url = base_url.into();
        let jwt_secret = jwt_secret.into();
        let service_role_key = service_role_key.into();

        if base_url.is_empty() {
            return Err(ValidationError::empty_field("auth_base_url"));
        }
        if jwt_secret.is_empty() {
            return Err(ValidationError::empty_field("auth_jwt_secret"));
        }
        if service_role_key.is_empty() {
            return Err(ValidationError::empty_field("auth_service_role_key"));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            jwt_secret: SecretString::new(jwt_secret),
            service_role_key: SecretString::new(service_role_key),
        })
    }
}

/// Claims carried by a GoTrue access token.
#[derive(Debug, Deserialize)]
struct AccessTokenClaims {
    /// Subject - the user id.
    sub: String,

    /// Expiry, Unix seconds. Checked by the JWT library.
    #[allow(dead_code)]
    exp: i64,

    /// User email.
    #[serde(default)]
    email: Option<String>,
}

/// GoTrue adapter implementing both auth ports.
pub struct GoTrueAuthAdapter {
    config: GoTrueConfig,
    http_client: reqwest::Client,
}

impl GoTrueAuthAdapter {
    pub fn new(config: GoTrueConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SessionValidator for GoTrueAuthAdapter {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[USER_AUDIENCE]);

        let key = DecodingKey::from_secret(self.config.jwt_secret.expose_secret().as_bytes());

        let data = decode::<AccessTokenClaims>(token, &key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!(error = %e, "Access token rejected");
                    AuthError::InvalidToken
                }
            }
        })?;

        let user_id = UserId::new(data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let email = data.claims.email.unwrap_or_default();

        Ok(AuthenticatedUser::new(user_id, email))
    }
}

#[async_trait]
impl IdentityProvider for GoTrueAuthAdapter {
    async fn delete_user(&self, user_id: &UserId) -> Result<(), AuthError> {
        let url = format!("{}/admin/users/{}", self.config.base_url, user_id);

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(self.config.service_role_key.expose_secret())
            .header("apikey", self.config.service_role_key.expose_secret())
            .send()
            .await
            .map_err(|e| AuthError::service_unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(user_id = %user_id, "Deleted auth identity");
                Ok(())
            }
            reqwest::StatusCode::NOT_FOUND => Err(AuthError::UserNotFound),
            status => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(
                    user_id = %user_id,
                    status = %status,
                    error = %body,
                    "Auth identity deletion failed"
                );
                Err(AuthError::service_unavailable(format!(
                    "auth service answered {}",
                    status
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "super-secret-jwt-key";

    fn config() -> GoTrueConfig {
        GoTrueConfig::new("https://project.example.co/auth/v1", SECRET, "service-role-key").unwrap()
    }

    fn token(claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    #[test]
    fn config_requires_all_values() {
        assert!(GoTrueConfig::new("", "secret", "key").is_err());
        assert!(GoTrueConfig::new("https://x", "", "key").is_err());
        assert!(GoTrueConfig::new("https://x", "secret", "").is_err());
    }

    #[test]
    fn config_trims_trailing_slash() {
        let config =
            GoTrueConfig::new("https://project.example.co/auth/v1/", "s", "k").unwrap();
        assert_eq!(config.base_url, "https://project.example.co/auth/v1");
    }

    #[tokio::test]
    async fn valid_token_yields_user() {
        let adapter = GoTrueAuthAdapter::new(config());
        let token = token(json!({
            "sub": "user-abc",
            "aud": "authenticated",
            "email": "user@example.com",
            "exp": now() + 3600
        }));

        let user = adapter.validate(&token).await.unwrap();
        assert_eq!(user.id.as_str(), "user-abc");
        assert_eq!(user.email, "user@example.com");
    }

    #[tokio::test]
    async fn expired_token_is_rejected_distinctly() {
        let adapter = GoTrueAuthAdapter::new(config());
        let token = token(json!({
            "sub": "user-abc",
            "aud": "authenticated",
            "exp": now() - 3600
        }));

        let result = adapter.validate(&token).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let adapter = GoTrueAuthAdapter::new(config());
        let token = token(json!({
            "sub": "user-abc",
            "aud": "service_role",
            "exp": now() + 3600
        }));

        let result = adapter.validate(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let adapter = GoTrueAuthAdapter::new(config());
        let result = adapter.validate("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let adapter = GoTrueAuthAdapter::new(config());
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &json!({"sub": "user-abc", "aud": "authenticated", "exp": now() + 3600}),
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();

        let result = adapter.validate(&forged).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
