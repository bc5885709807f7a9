//! PostgreSQL implementation of `UserDataStore`.
//!
//! The per-table deletes used by the account deletion cascade. Chat messages
//! hang off sessions, so they go first via a subquery.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::UserDataStore;

/// PostgreSQL-backed user data deletion.
pub struct PostgresUserDataStore {
    pool: PgPool,
}

impl PostgresUserDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn delete_where_user(
        &self,
        sql: &str,
        user_id: &UserId,
    ) -> Result<u64, DomainError> {
        let user_uuid = parse_user_uuid(user_id)?;

        let result = sqlx::query(sql)
            .bind(user_uuid)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

fn parse_user_uuid(user_id: &UserId) -> Result<Uuid, DomainError> {
    Uuid::parse_str(user_id.as_str()).map_err(|e| {
        DomainError::new(
            ErrorCode::ValidationFailed,
            format!("User ID must be a valid UUID: {}", e),
        )
    })
}

#[async_trait]
impl UserDataStore for PostgresUserDataStore {
    async fn delete_chat_messages(&self, user_id: &UserId) -> Result<u64, DomainError> {
        self.delete_where_user(
            "DELETE FROM chat_messages WHERE session_id IN \
             (SELECT id FROM chat_sessions WHERE user_id = $1)",
            user_id,
        )
        .await
    }

    async fn delete_chat_sessions(&self, user_id: &UserId) -> Result<u64, DomainError> {
        self.delete_where_user("DELETE FROM chat_sessions WHERE user_id = $1", user_id)
            .await
    }

    async fn delete_food_logs(&self, user_id: &UserId) -> Result<u64, DomainError> {
        self.delete_where_user("DELETE FROM food_logs WHERE user_id = $1", user_id)
            .await
    }

    async fn delete_profile(&self, user_id: &UserId) -> Result<(), DomainError> {
        self.delete_where_user("DELETE FROM user_profiles WHERE user_id = $1", user_id)
            .await
            .map(|_| ())
    }

    async fn delete_user_record(&self, user_id: &UserId) -> Result<(), DomainError> {
        self.delete_where_user("DELETE FROM users WHERE id = $1", user_id)
            .await
            .map(|_| ())
    }
}
