//! PostgreSQL implementation of `SubscriptionEventLog`.
//!
//! Append-only writes to the `subscription_events` table. Rows are only ever
//! removed wholesale when an account is deleted.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{SubscriptionEventLog, SubscriptionEventRecord};

/// PostgreSQL-backed subscription event log.
pub struct PostgresEventLog {
    pool: PgPool,
}

impl PostgresEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::database(e.to_string())
}

#[async_trait]
impl SubscriptionEventLog for PostgresEventLog {
    async fn append(&self, record: SubscriptionEventRecord) -> Result<(), DomainError> {
        let user_uuid = record
            .user_id
            .as_ref()
            .map(|user_id| {
                Uuid::parse_str(user_id.as_str()).map_err(|e| {
                    DomainError::new(
                        ErrorCode::ValidationFailed,
                        format!("User ID must be a valid UUID: {}", e),
                    )
                })
            })
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO subscription_events
                (event_id, user_id, subscription_id, event_type, event_data, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&record.event_id)
        .bind(user_uuid)
        .bind(&record.subscription_id)
        .bind(&record.event_type)
        .bind(&record.payload)
        .bind(record.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete_for_user(&self, user_id: &UserId) -> Result<u64, DomainError> {
        let user_uuid = Uuid::parse_str(user_id.as_str()).map_err(|e| {
            DomainError::new(
                ErrorCode::ValidationFailed,
                format!("User ID must be a valid UUID: {}", e),
            )
        })?;

        let result = sqlx::query("DELETE FROM subscription_events WHERE user_id = $1")
            .bind(user_uuid)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected())
    }
}
