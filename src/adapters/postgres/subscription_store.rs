//! PostgreSQL implementation of `SubscriptionStore`.
//!
//! Subscription state lives on the `user_profiles` table, one row per user.
//! Patches compile to a single `UPDATE` whose unpatched columns are kept via
//! `COALESCE`, so each event type writes only the fields it owns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    PlanType, RecordKey, SubscriptionPatch, SubscriptionRecord, SubscriptionStatus,
};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{ApplyOutcome, SubscriptionStore};

/// PostgreSQL-backed subscription store.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Creates a store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row for the subscription columns of `user_profiles`.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: Uuid,
    stripe_customer_id: Option<String>,
    subscription_id: Option<String>,
    plan_type: Option<String>,
    subscription_status: Option<String>,
    subscription_current_period_start: Option<DateTime<Utc>>,
    subscription_current_period_end: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

const SELECT_COLUMNS: &str = "user_id, stripe_customer_id, subscription_id, plan_type, \
     subscription_status, subscription_current_period_start, \
     subscription_current_period_end, updated_at";

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id.to_string()).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?;

        Ok(SubscriptionRecord {
            user_id,
            billing_customer_id: row.stripe_customer_id,
            subscription_id: row.subscription_id,
            plan_type: row.plan_type.as_deref().and_then(PlanType::parse),
            status: row
                .subscription_status
                .as_deref()
                .map(SubscriptionStatus::parse)
                .unwrap_or_default(),
            current_period_start: row
                .subscription_current_period_start
                .map(Timestamp::from_datetime),
            current_period_end: row
                .subscription_current_period_end
                .map(Timestamp::from_datetime),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
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

fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::database(e.to_string())
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let user_uuid = parse_user_uuid(user_id)?;

        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM user_profiles WHERE user_id = $1",
            SELECT_COLUMNS
        ))
        .bind(user_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM user_profiles WHERE subscription_id = $1",
            SELECT_COLUMNS
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn apply(
        &self,
        key: &RecordKey,
        patch: SubscriptionPatch,
    ) -> Result<ApplyOutcome, DomainError> {
        let set_clause = "SET subscription_status = COALESCE($1, subscription_status), \
                 subscription_id = COALESCE($2, subscription_id), \
                 plan_type = COALESCE($3, plan_type), \
                 subscription_current_period_start = \
                     COALESCE($4, subscription_current_period_start), \
                 subscription_current_period_end = \
                     COALESCE($5, subscription_current_period_end), \
                 updated_at = NOW()";

        let status = patch.status.map(|s| s.as_str());
        let plan_type = patch.plan_type.map(|p| p.as_str());
        let period_start = patch.current_period_start.map(|t| *t.as_datetime());
        let period_end = patch.current_period_end.map(|t| *t.as_datetime());

        let result = match key {
            RecordKey::ByUser(user_id) => {
                let user_uuid = parse_user_uuid(user_id)?;
                sqlx::query(&format!(
                    "UPDATE user_profiles {} WHERE user_id = $6",
                    set_clause
                ))
                .bind(status)
                .bind(&patch.subscription_id)
                .bind(plan_type)
                .bind(period_start)
                .bind(period_end)
                .bind(user_uuid)
                .execute(&self.pool)
                .await
            }
            RecordKey::BySubscription(subscription_id) => {
                sqlx::query(&format!(
                    "UPDATE user_profiles {} WHERE subscription_id = $6",
                    set_clause
                ))
                .bind(status)
                .bind(&patch.subscription_id)
                .bind(plan_type)
                .bind(period_start)
                .bind(period_end)
                .bind(subscription_id)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        if result.rows_affected() > 0 {
            Ok(ApplyOutcome::Applied)
        } else {
            Ok(ApplyOutcome::NoMatch)
        }
    }

    async fn set_billing_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        let user_uuid = parse_user_uuid(user_id)?;

        // Set-once guard: a concurrent first checkout cannot overwrite an
        // id that already landed.
        sqlx::query(
            "UPDATE user_profiles SET stripe_customer_id = $2, updated_at = NOW() \
             WHERE user_id = $1 AND stripe_customer_id IS NULL",
        )
        .bind(user_uuid)
        .bind(customer_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
