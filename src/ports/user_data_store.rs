//! UserDataStore port - per-table deletion of a user's application data.
//!
//! Account deletion walks these operations in a fixed order. Row-count
//! returns let the orchestrator log what was actually removed.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};

/// Port over the application data tables touched by account deletion.
#[async_trait]
pub trait UserDataStore: Send + Sync {
    /// Deletes all chat messages belonging to the user's chat sessions.
    async fn delete_chat_messages(&self, user_id: &UserId) -> Result<u64, DomainError>;

    /// Deletes the user's chat sessions.
    async fn delete_chat_sessions(&self, user_id: &UserId) -> Result<u64, DomainError>;

    /// Deletes the user's food log entries.
    async fn delete_food_logs(&self, user_id: &UserId) -> Result<u64, DomainError>;

    /// Deletes the user's profile record.
    ///
    /// Structural delete: a failure here aborts the deletion cascade.
    async fn delete_profile(&self, user_id: &UserId) -> Result<(), DomainError>;

    /// Deletes the core user record.
    ///
    /// Structural delete: a failure here aborts the deletion cascade.
    async fn delete_user_record(&self, user_id: &UserId) -> Result<(), DomainError>;
}
