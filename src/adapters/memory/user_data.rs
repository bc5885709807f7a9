//! In-memory implementation of `UserDataStore`.
//!
//! Tracks which deletes ran (and in what order) so the deletion cascade can
//! be asserted against. Individual steps can be made to fail.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::UserDataStore;

/// Process-local user data tables with failure injection.
pub struct InMemoryUserDataStore {
    deleted_steps: RwLock<Vec<&'static str>>,
    failing_steps: HashSet<&'static str>,
    chat_message_count: u64,
}

impl InMemoryUserDataStore {
    pub fn new() -> Self {
        Self {
            deleted_steps: RwLock::new(Vec::new()),
            failing_steps: HashSet::new(),
            chat_message_count: 3,
        }
    }

    /// Makes the named step fail ("chat_messages", "profile", ...).
    pub fn with_failing_step(mut self, step: &'static str) -> Self {
        self.failing_steps.insert(step);
        self
    }

    /// Names of the delete operations that ran, in order.
    pub async fn executed_steps(&self) -> Vec<&'static str> {
        self.deleted_steps.read().await.clone()
    }

    async fn run(&self, step: &'static str) -> Result<u64, DomainError> {
        if self.failing_steps.contains(step) {
            return Err(DomainError::database(format!("simulated {} failure", step)));
        }
        self.deleted_steps.write().await.push(step);
        Ok(self.chat_message_count)
    }
}

impl Default for InMemoryUserDataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDataStore for InMemoryUserDataStore {
    async fn delete_chat_messages(&self, _user_id: &UserId) -> Result<u64, DomainError> {
        self.run("chat_messages").await
    }

    async fn delete_chat_sessions(&self, _user_id: &UserId) -> Result<u64, DomainError> {
        self.run("chat_sessions").await
    }

    async fn delete_food_logs(&self, _user_id: &UserId) -> Result<u64, DomainError> {
        self.run("food_logs").await
    }

    async fn delete_profile(&self, _user_id: &UserId) -> Result<(), DomainError> {
        self.run("profile").await.map(|_| ())
    }

    async fn delete_user_record(&self, _user_id: &UserId) -> Result<(), DomainError> {
        self.run("user_record").await.map(|_| ())
    }
}
