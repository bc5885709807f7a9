//! Mock auth adapters for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::{IdentityProvider, SessionValidator};

/// Session validator backed by a token → user table.
pub struct MockSessionValidator {
    users: Mutex<HashMap<String, AuthenticatedUser>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a token that validates to the given user.
    pub fn with_token(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.users.lock().unwrap().insert(token.into(), user);
        self
    }
}

impl Default for MockSessionValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.users
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// Identity provider recording deletions.
pub struct MockIdentityProvider {
    deleted: Mutex<Vec<UserId>>,
    fail_deletes: bool,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            deleted: Mutex::new(Vec::new()),
            fail_deletes: false,
        }
    }

    /// A provider whose deletions always fail.
    pub fn failing() -> Self {
        Self {
            deleted: Mutex::new(Vec::new()),
            fail_deletes: true,
        }
    }

    /// Users whose identities were deleted, in order.
    pub fn deleted_users(&self) -> Vec<UserId> {
        self.deleted.lock().unwrap().clone()
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn delete_user(&self, user_id: &UserId) -> Result<(), AuthError> {
        if self.fail_deletes {
            return Err(AuthError::service_unavailable("simulated identity failure"));
        }
        self.deleted.lock().unwrap().push(user_id.clone());
        Ok(())
    }
}
