//! DeleteAccountHandler - guarded, multi-resource account deletion.
//!
//! Deletion is refused outright while a subscription is active. Once past
//! the gate, an ordered list of steps runs: best-effort steps are logged and
//! skipped on failure so a single missing table does not block account
//! removal, while the structural deletes (profile, user record) and the
//! final identity deletion abort the cascade when they fail.

use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{IdentityProvider, PaymentProvider, SubscriptionEventLog, SubscriptionStore, UserDataStore};

/// Command to delete the authenticated user's account.
#[derive(Debug, Clone)]
pub struct DeleteAccountCommand {
    pub user_id: UserId,
}

/// Result of a completed deletion.
#[derive(Debug, Clone)]
pub struct DeleteAccountResult {
    /// Best-effort steps that failed and were skipped.
    pub skipped_steps: Vec<&'static str>,
}

/// Errors surfaced by the deletion flow.
#[derive(Debug, Error)]
pub enum DeletionError {
    /// Hard precondition: the user must cancel before deleting.
    #[error("Cannot delete account with active subscription. Please cancel your subscription first.")]
    ActiveSubscription,

    /// The user's subscription record could not be read.
    #[error("Failed to fetch user profile: {0}")]
    ProfileLookup(String),

    /// A fatal cascade step failed; remaining steps were not run.
    #[error("Account deletion failed at {step}: {reason}")]
    StepFailed {
        step: &'static str,
        reason: String,
    },
}

/// One step of the deletion cascade.
struct DeletionStep<'a> {
    name: &'static str,
    fatal: bool,
    run: BoxFuture<'a, Result<(), DomainError>>,
}

/// Handler orchestrating the deletion cascade.
pub struct DeleteAccountHandler {
    store: Arc<dyn SubscriptionStore>,
    event_log: Arc<dyn SubscriptionEventLog>,
    user_data: Arc<dyn UserDataStore>,
    payment_provider: Arc<dyn PaymentProvider>,
    identity_provider: Arc<dyn IdentityProvider>,
}

impl DeleteAccountHandler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        event_log: Arc<dyn SubscriptionEventLog>,
        user_data: Arc<dyn UserDataStore>,
        payment_provider: Arc<dyn PaymentProvider>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            event_log,
            user_data,
            payment_provider,
            identity_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: DeleteAccountCommand,
    ) -> Result<DeleteAccountResult, DeletionError> {
        let user_id = &cmd.user_id;

        // Subscription gate: refuse while active, before touching anything
        let record = self
            .store
            .find_by_user_id(user_id)
            .await
            .map_err(|e| DeletionError::ProfileLookup(e.to_string()))?
            .ok_or_else(|| DeletionError::ProfileLookup("profile not found".to_string()))?;

        if record.is_active() {
            return Err(DeletionError::ActiveSubscription);
        }

        tracing::info!(user_id = %user_id, "Starting account deletion");

        let billing_customer_id = record.billing_customer_id.clone();
        let steps = self.build_steps(user_id, billing_customer_id.as_deref());

        let mut skipped: Vec<(&'static str, String)> = Vec::new();

        for step in steps {
            match step.run.await {
                Ok(()) => {}
                Err(e) if step.fatal => {
                    tracing::error!(
                        user_id = %user_id,
                        step = step.name,
                        error = %e,
                        "Fatal deletion step failed, aborting cascade"
                    );
                    return Err(DeletionError::StepFailed {
                        step: step.name,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    skipped.push((step.name, e.to_string()));
                }
            }
        }

        if !skipped.is_empty() {
            // Single diagnostic entry covering every skipped step
            tracing::warn!(
                user_id = %user_id,
                skipped = ?skipped,
                "Account deleted with best-effort steps skipped"
            );
        }

        tracing::info!(user_id = %user_id, "Account deleted");

        Ok(DeleteAccountResult {
            skipped_steps: skipped.into_iter().map(|(name, _)| name).collect(),
        })
    }

    /// The cascade, in order. Chat data and audit rows are best-effort; the
    /// structural deletes and the final identity deletion are fatal. The
    /// provider customer is removed only when one exists, and failures there
    /// never block removal of the account itself.
    fn build_steps<'a>(
        &'a self,
        user_id: &'a UserId,
        billing_customer_id: Option<&'a str>,
    ) -> Vec<DeletionStep<'a>> {
        let mut steps = vec![
            DeletionStep {
                name: "chat_messages",
                fatal: false,
                run: Box::pin(async move {
                    self.user_data.delete_chat_messages(user_id).await.map(|_| ())
                }),
            },
            DeletionStep {
                name: "chat_sessions",
                fatal: false,
                run: Box::pin(async move {
                    self.user_data.delete_chat_sessions(user_id).await.map(|_| ())
                }),
            },
            DeletionStep {
                name: "food_logs",
                fatal: false,
                run: Box::pin(async move {
                    self.user_data.delete_food_logs(user_id).await.map(|_| ())
                }),
            },
            DeletionStep {
                name: "subscription_events",
                fatal: false,
                run: Box::pin(async move {
                    self.event_log.delete_for_user(user_id).await.map(|_| ())
                }),
            },
            DeletionStep {
                name: "user_profile",
                fatal: true,
                run: Box::pin(async move { self.user_data.delete_profile(user_id).await }),
            },
            DeletionStep {
                name: "user_record",
                fatal: true,
                run: Box::pin(async move { self.user_data.delete_user_record(user_id).await }),
            },
        ];

        if let Some(customer_id) = billing_customer_id {
            steps.push(DeletionStep {
                name: "billing_customer",
                fatal: false,
                run: Box::pin(async move {
                    self.payment_provider
                        .delete_customer(customer_id)
                        .await
                        .map_err(|e| DomainError::new(
                            crate::domain::foundation::ErrorCode::ExternalServiceError,
                            e.to_string(),
                        ))
                }),
            });
        }

        // Identity last: everything referencing the user is already gone
        steps.push(DeletionStep {
            name: "auth_identity",
            fatal: true,
            run: Box::pin(async move {
                self.identity_provider.delete_user(user_id).await.map_err(|e| {
                    DomainError::new(
                        crate::domain::foundation::ErrorCode::ExternalServiceError,
                        e.to_string(),
                    )
                })
            }),
        });

        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockIdentityProvider;
    use crate::adapters::memory::{InMemoryEventLog, InMemorySubscriptionStore, InMemoryUserDataStore};
    use crate::adapters::stripe::MockPaymentGateway;
    use crate::domain::billing::{SubscriptionRecord, SubscriptionStatus};
    use crate::domain::foundation::Timestamp;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn record(status: SubscriptionStatus, customer: Option<&str>) -> SubscriptionRecord {
        SubscriptionRecord {
            user_id: user("user-1"),
            billing_customer_id: customer.map(str::to_owned),
            subscription_id: Some("sub_1".to_string()),
            plan_type: None,
            status,
            current_period_start: None,
            current_period_end: None,
            updated_at: Timestamp::now(),
        }
    }

    struct Fixture {
        handler: DeleteAccountHandler,
        user_data: Arc<InMemoryUserDataStore>,
        gateway: Arc<MockPaymentGateway>,
        identity: Arc<MockIdentityProvider>,
    }

    async fn fixture(record_: SubscriptionRecord, user_data: InMemoryUserDataStore) -> Fixture {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.insert_record(record_).await;
        let event_log = Arc::new(InMemoryEventLog::new());
        let user_data = Arc::new(user_data);
        let gateway = Arc::new(MockPaymentGateway::new());
        let identity = Arc::new(MockIdentityProvider::new());

        Fixture {
            handler: DeleteAccountHandler::new(
                store,
                event_log,
                user_data.clone(),
                gateway.clone(),
                identity.clone(),
            ),
            user_data,
            gateway,
            identity,
        }
    }

    fn cmd() -> DeleteAccountCommand {
        DeleteAccountCommand {
            user_id: user("user-1"),
        }
    }

    #[tokio::test]
    async fn active_subscription_blocks_deletion_entirely() {
        let f = fixture(
            record(SubscriptionStatus::Active, Some("cus_1")),
            InMemoryUserDataStore::new(),
        )
        .await;

        let result = f.handler.handle(cmd()).await;

        assert!(matches!(result, Err(DeletionError::ActiveSubscription)));
        assert!(f.user_data.executed_steps().await.is_empty());
        assert!(f.identity.deleted_users().is_empty());
        assert_eq!(f.gateway.customers_deleted(), 0);
    }

    #[tokio::test]
    async fn canceled_subscription_runs_full_cascade_in_order() {
        let f = fixture(
            record(SubscriptionStatus::Canceled, Some("cus_1")),
            InMemoryUserDataStore::new(),
        )
        .await;

        let result = f.handler.handle(cmd()).await.unwrap();

        assert!(result.skipped_steps.is_empty());
        assert_eq!(
            f.user_data.executed_steps().await,
            vec!["chat_messages", "chat_sessions", "food_logs", "profile", "user_record"]
        );
        assert_eq!(f.gateway.customers_deleted(), 1);
        assert_eq!(f.identity.deleted_users(), vec![user("user-1")]);
    }

    #[tokio::test]
    async fn inactive_user_without_customer_skips_provider_step() {
        let f = fixture(
            record(SubscriptionStatus::Inactive, None),
            InMemoryUserDataStore::new(),
        )
        .await;

        f.handler.handle(cmd()).await.unwrap();

        assert_eq!(f.gateway.customers_deleted(), 0);
        assert_eq!(f.identity.deleted_users(), vec![user("user-1")]);
    }

    #[tokio::test]
    async fn best_effort_failure_is_skipped_and_cascade_continues() {
        let f = fixture(
            record(SubscriptionStatus::Canceled, None),
            InMemoryUserDataStore::new().with_failing_step("chat_messages"),
        )
        .await;

        let result = f.handler.handle(cmd()).await.unwrap();

        assert_eq!(result.skipped_steps, vec!["chat_messages"]);
        // The rest of the cascade still ran
        assert_eq!(f.identity.deleted_users(), vec![user("user-1")]);
    }

    #[tokio::test]
    async fn fatal_profile_failure_aborts_before_identity_deletion() {
        let f = fixture(
            record(SubscriptionStatus::Canceled, None),
            InMemoryUserDataStore::new().with_failing_step("profile"),
        )
        .await;

        let result = f.handler.handle(cmd()).await;

        assert!(matches!(
            result,
            Err(DeletionError::StepFailed { step: "user_profile", .. })
        ));
        assert!(f.identity.deleted_users().is_empty());
    }

    #[tokio::test]
    async fn provider_customer_failure_does_not_block_identity_deletion() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.insert_record(record(SubscriptionStatus::Canceled, Some("cus_1"))).await;
        let identity = Arc::new(MockIdentityProvider::new());
        let handler = DeleteAccountHandler::new(
            store,
            Arc::new(InMemoryEventLog::new()),
            Arc::new(InMemoryUserDataStore::new()),
            Arc::new(MockPaymentGateway::failing()),
            identity.clone(),
        );

        let result = handler.handle(cmd()).await.unwrap();

        assert_eq!(result.skipped_steps, vec!["billing_customer"]);
        assert_eq!(identity.deleted_users(), vec![user("user-1")]);
    }

    #[tokio::test]
    async fn identity_failure_is_fatal() {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.insert_record(record(SubscriptionStatus::Canceled, None)).await;
        let handler = DeleteAccountHandler::new(
            store,
            Arc::new(InMemoryEventLog::new()),
            Arc::new(InMemoryUserDataStore::new()),
            Arc::new(MockPaymentGateway::new()),
            Arc::new(MockIdentityProvider::failing()),
        );

        let result = handler.handle(cmd()).await;
        assert!(matches!(
            result,
            Err(DeletionError::StepFailed { step: "auth_identity", .. })
        ));
    }

    #[tokio::test]
    async fn missing_profile_is_a_lookup_error() {
        let handler = DeleteAccountHandler::new(
            Arc::new(InMemorySubscriptionStore::new()),
            Arc::new(InMemoryEventLog::new()),
            Arc::new(InMemoryUserDataStore::new()),
            Arc::new(MockPaymentGateway::new()),
            Arc::new(MockIdentityProvider::new()),
        );

        let result = handler.handle(cmd()).await;
        assert!(matches!(result, Err(DeletionError::ProfileLookup(_))));
    }

    #[tokio::test]
    async fn audit_rows_are_removed_with_the_account() {
        use crate::ports::{SubscriptionEventLog, SubscriptionEventRecord};

        let store = Arc::new(InMemorySubscriptionStore::new());
        store.insert_record(record(SubscriptionStatus::Canceled, None)).await;
        let event_log = Arc::new(InMemoryEventLog::new());
        event_log
            .append(SubscriptionEventRecord {
                event_id: "evt_1".to_string(),
                user_id: Some(user("user-1")),
                subscription_id: None,
                event_type: "checkout.session.completed".to_string(),
                payload: serde_json::json!({}),
                received_at: Timestamp::now(),
            })
            .await
            .unwrap();

        let handler = DeleteAccountHandler::new(
            store,
            event_log.clone(),
            Arc::new(InMemoryUserDataStore::new()),
            Arc::new(MockPaymentGateway::new()),
            Arc::new(MockIdentityProvider::new()),
        );

        handler.handle(cmd()).await.unwrap();
        assert!(event_log.records().await.is_empty());
    }
}
