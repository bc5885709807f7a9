//! Subscription state reconciliation.
//!
//! Applies provider lifecycle events to the durable per-user subscription
//! record. Every operation is an idempotent upsert of a narrow field set;
//! re-delivered events and most out-of-order interleavings converge to the
//! same state.
//!
//! ## Known limitation
//!
//! Deliveries carry no ordering guarantee, and there is no per-record event
//! clock: a stale `customer.subscription.updated` arriving after a
//! `customer.subscription.deleted` can overwrite the canceled status with
//! the subscription's earlier state. The upstream system behaves the same
//! way; status settles once duplicate deliveries stop.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{ApplyOutcome, SubscriptionStore};

use super::dispatcher::{EventHandler, HandlerOutcome};
use super::errors::WebhookError;
use super::event::{
    BillingEvent, BillingEventType, CheckoutSessionObject, InvoiceObject, SubscriptionObject,
};
use super::plan::PlanType;
use super::subscription::{RecordKey, SubscriptionPatch, SubscriptionStatus};

/// Reconciles webhook events into subscription records.
pub struct SubscriptionReconciler {
    store: Arc<dyn SubscriptionStore>,
}

impl SubscriptionReconciler {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Checkout completed: activate the subscription chosen at checkout.
    ///
    /// Requires `user_id` and `plan_type` metadata; without them the event
    /// cannot be attributed and is skipped.
    async fn on_checkout_completed(
        &self,
        event: &BillingEvent,
    ) -> Result<HandlerOutcome, WebhookError> {
        let session: CheckoutSessionObject = event.deserialize_object()?;

        let user_id = session.metadata.get("user_id").map(String::as_str);
        let plan_raw = session.metadata.get("plan_type").map(String::as_str);

        let (user_id, plan_raw) = match (user_id, plan_raw) {
            (Some(user_id), Some(plan)) => (user_id, plan),
            _ => {
                tracing::warn!(
                    session_id = %session.id,
                    "Missing user_id or plan_type in session metadata"
                );
                return Ok(HandlerOutcome::skipped("missing checkout metadata"));
            }
        };

        let plan_type = match PlanType::parse(plan_raw) {
            Some(plan) => plan,
            None => {
                tracing::warn!(
                    session_id = %session.id,
                    plan_type = %plan_raw,
                    "Unrecognized plan_type in session metadata"
                );
                return Ok(HandlerOutcome::skipped("unrecognized plan_type"));
            }
        };

        let user_id = parse_user_id(user_id)?;
        let patch = SubscriptionPatch {
            status: Some(SubscriptionStatus::Active),
            subscription_id: session.subscription.clone(),
            plan_type: Some(plan_type),
            ..Default::default()
        };

        let outcome = self.store.apply(&RecordKey::ByUser(user_id.clone()), patch).await?;
        match outcome {
            ApplyOutcome::Applied => {
                tracing::info!(
                    user_id = %user_id,
                    plan_type = %plan_type,
                    "Checkout completed, subscription activated"
                );
                Ok(HandlerOutcome::Applied)
            }
            ApplyOutcome::NoMatch => {
                tracing::warn!(user_id = %user_id, "No subscription record for checkout user");
                Ok(HandlerOutcome::skipped("no record for user"))
            }
        }
    }

    /// Subscription created: record the full initial subscription state.
    async fn on_subscription_created(
        &self,
        event: &BillingEvent,
    ) -> Result<HandlerOutcome, WebhookError> {
        let subscription: SubscriptionObject = event.deserialize_object()?;

        let user_id = match subscription.metadata.get("user_id") {
            Some(user_id) => parse_user_id(user_id)?,
            None => {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    "Missing user_id in subscription metadata"
                );
                return Ok(HandlerOutcome::skipped("missing user_id metadata"));
            }
        };

        let patch = SubscriptionPatch {
            status: Some(SubscriptionStatus::parse(&subscription.status)),
            subscription_id: Some(subscription.id.clone()),
            plan_type: subscription
                .metadata
                .get("plan_type")
                .and_then(|p| PlanType::parse(p)),
            current_period_start: period_timestamp(subscription.current_period_start),
            current_period_end: period_timestamp(subscription.current_period_end),
        };

        let outcome = self.store.apply(&RecordKey::ByUser(user_id.clone()), patch).await?;
        match outcome {
            ApplyOutcome::Applied => {
                tracing::info!(user_id = %user_id, subscription_id = %subscription.id, "Subscription created");
                Ok(HandlerOutcome::Applied)
            }
            ApplyOutcome::NoMatch => {
                tracing::warn!(user_id = %user_id, "No subscription record for user");
                Ok(HandlerOutcome::skipped("no record for user"))
            }
        }
    }

    /// Subscription updated: refresh status and period bounds only.
    ///
    /// Plan changes are driven by checkout, so `plan_type` is never touched
    /// here.
    async fn on_subscription_updated(
        &self,
        event: &BillingEvent,
    ) -> Result<HandlerOutcome, WebhookError> {
        let subscription: SubscriptionObject = event.deserialize_object()?;
        let key = self.resolve_subscription_key(&subscription).await?;

        let key = match key {
            Some(key) => key,
            None => {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    "Cannot find user for subscription"
                );
                return Ok(HandlerOutcome::skipped("unknown subscription"));
            }
        };

        let patch = SubscriptionPatch {
            status: Some(SubscriptionStatus::parse(&subscription.status)),
            current_period_start: period_timestamp(subscription.current_period_start),
            current_period_end: period_timestamp(subscription.current_period_end),
            ..Default::default()
        };

        self.apply_resolved(&key, patch, &subscription.id, "Subscription updated").await
    }

    /// Subscription deleted: mark the record canceled.
    ///
    /// The stored subscription id is retained; the reactivate flow needs it
    /// and nothing else reuses the field.
    async fn on_subscription_deleted(
        &self,
        event: &BillingEvent,
    ) -> Result<HandlerOutcome, WebhookError> {
        let subscription: SubscriptionObject = event.deserialize_object()?;
        let key = self.resolve_subscription_key(&subscription).await?;

        let key = match key {
            Some(key) => key,
            None => {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    "Cannot find user for subscription"
                );
                return Ok(HandlerOutcome::skipped("unknown subscription"));
            }
        };

        let patch = SubscriptionPatch::status_only(SubscriptionStatus::Canceled);
        self.apply_resolved(&key, patch, &subscription.id, "Subscription canceled").await
    }

    /// Invoice payment succeeded: settle the record back to active.
    async fn on_payment_succeeded(
        &self,
        event: &BillingEvent,
    ) -> Result<HandlerOutcome, WebhookError> {
        self.apply_invoice_status(event, SubscriptionStatus::Active, "Payment succeeded")
            .await
    }

    /// Invoice payment failed: flag the record past due.
    async fn on_payment_failed(
        &self,
        event: &BillingEvent,
    ) -> Result<HandlerOutcome, WebhookError> {
        self.apply_invoice_status(event, SubscriptionStatus::PastDue, "Payment failed")
            .await
    }

    /// Shared invoice path: invoices carry no user metadata, so resolution
    /// is by subscription id alone.
    async fn apply_invoice_status(
        &self,
        event: &BillingEvent,
        status: SubscriptionStatus,
        context: &'static str,
    ) -> Result<HandlerOutcome, WebhookError> {
        let invoice: InvoiceObject = event.deserialize_object()?;

        let subscription_id = match invoice.subscription {
            Some(subscription_id) => subscription_id,
            None => {
                tracing::warn!(invoice_id = %invoice.id, "No subscription id on invoice");
                return Ok(HandlerOutcome::skipped("invoice without subscription"));
            }
        };

        let key = RecordKey::BySubscription(subscription_id.clone());
        let patch = SubscriptionPatch::status_only(status);
        let outcome = self.store.apply(&key, patch).await?;

        match outcome {
            ApplyOutcome::Applied => {
                tracing::info!(subscription_id = %subscription_id, "{}", context);
                Ok(HandlerOutcome::Applied)
            }
            ApplyOutcome::NoMatch => {
                // Stale or foreign subscription; must not fail the pipeline
                tracing::warn!(
                    subscription_id = %subscription_id,
                    "No subscription record matches invoice"
                );
                Ok(HandlerOutcome::skipped("unknown subscription"))
            }
        }
    }

    /// Resolution rule shared by update and delete: prefer `user_id`
    /// metadata, fall back to the stored subscription id.
    async fn resolve_subscription_key(
        &self,
        subscription: &SubscriptionObject,
    ) -> Result<Option<RecordKey>, WebhookError> {
        if let Some(user_id) = subscription.metadata.get("user_id") {
            return Ok(Some(RecordKey::ByUser(parse_user_id(user_id)?)));
        }

        let record = self.store.find_by_subscription_id(&subscription.id).await?;
        Ok(record.map(|_| RecordKey::BySubscription(subscription.id.clone())))
    }

    async fn apply_resolved(
        &self,
        key: &RecordKey,
        patch: SubscriptionPatch,
        subscription_id: &str,
        context: &'static str,
    ) -> Result<HandlerOutcome, WebhookError> {
        match self.store.apply(key, patch).await? {
            ApplyOutcome::Applied => {
                tracing::info!(subscription_id = %subscription_id, "{}", context);
                Ok(HandlerOutcome::Applied)
            }
            ApplyOutcome::NoMatch => {
                tracing::warn!(
                    subscription_id = %subscription_id,
                    key = %key,
                    "No subscription record matched"
                );
                Ok(HandlerOutcome::skipped("no record matched"))
            }
        }
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, WebhookError> {
    UserId::new(raw).map_err(|e| WebhookError::MalformedEvent(e.to_string()))
}

fn period_timestamp(secs: Option<i64>) -> Option<Timestamp> {
    secs.and_then(Timestamp::from_unix_seconds)
}

#[async_trait]
impl EventHandler for SubscriptionReconciler {
    fn handles(&self) -> Vec<BillingEventType> {
        vec![
            BillingEventType::CheckoutSessionCompleted,
            BillingEventType::SubscriptionCreated,
            BillingEventType::SubscriptionUpdated,
            BillingEventType::SubscriptionDeleted,
            BillingEventType::InvoicePaymentSucceeded,
            BillingEventType::InvoicePaymentFailed,
        ]
    }

    async fn handle(&self, event: &BillingEvent) -> Result<HandlerOutcome, WebhookError> {
        match event.parsed_type() {
            BillingEventType::CheckoutSessionCompleted => self.on_checkout_completed(event).await,
            BillingEventType::SubscriptionCreated => self.on_subscription_created(event).await,
            BillingEventType::SubscriptionUpdated => self.on_subscription_updated(event).await,
            BillingEventType::SubscriptionDeleted => self.on_subscription_deleted(event).await,
            BillingEventType::InvoicePaymentSucceeded => self.on_payment_succeeded(event).await,
            BillingEventType::InvoicePaymentFailed => self.on_payment_failed(event).await,
            BillingEventType::Unknown => Ok(HandlerOutcome::skipped("unknown event type")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::domain::billing::BillingEventBuilder;
    use serde_json::json;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn store_with_user(id: &str) -> Arc<InMemorySubscriptionStore> {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.insert_user(user(id)).await;
        store
    }

    fn checkout_event(user_id: &str, plan: &str, subscription: &str) -> BillingEvent {
        BillingEventBuilder::new()
            .event_type("checkout.session.completed")
            .object(json!({
                "id": "cs_1",
                "subscription": subscription,
                "metadata": {"user_id": user_id, "plan_type": plan}
            }))
            .build()
    }

    fn subscription_event(event_type: &str, object: serde_json::Value) -> BillingEvent {
        BillingEventBuilder::new().event_type(event_type).object(object).build()
    }

    // ── Checkout completed ───────────────────────────────────────────

    #[tokio::test]
    async fn checkout_activates_subscription() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());

        let outcome = reconciler
            .handle(&checkout_event("user-1", "steady", "sub_1"))
            .await
            .unwrap();

        assert_eq!(outcome, HandlerOutcome::Applied);
        let record = store.find_by_user_id(&user("user-1")).await.unwrap().unwrap();
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(record.plan_type, Some(PlanType::Steady));
    }

    #[tokio::test]
    async fn checkout_without_metadata_is_skipped() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());

        let event = BillingEventBuilder::new()
            .event_type("checkout.session.completed")
            .object(json!({"id": "cs_1", "subscription": "sub_1"}))
            .build();

        let outcome = reconciler.handle(&event).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));

        let record = store.find_by_user_id(&user("user-1")).await.unwrap().unwrap();
        assert_eq!(record.status, SubscriptionStatus::Inactive);
    }

    #[tokio::test]
    async fn checkout_with_bogus_plan_is_skipped() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());

        let outcome = reconciler
            .handle(&checkout_event("user-1", "platinum", "sub_1"))
            .await
            .unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn checkout_is_idempotent() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());
        let event = checkout_event("user-1", "intensive", "sub_9");

        reconciler.handle(&event).await.unwrap();
        let first = store.find_by_user_id(&user("user-1")).await.unwrap().unwrap();
        reconciler.handle(&event).await.unwrap();
        let second = store.find_by_user_id(&user("user-1")).await.unwrap().unwrap();

        assert_eq!(first.status, second.status);
        assert_eq!(first.subscription_id, second.subscription_id);
        assert_eq!(first.plan_type, second.plan_type);
    }

    // ── Subscription created ─────────────────────────────────────────

    #[tokio::test]
    async fn created_records_status_and_periods() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());

        let event = subscription_event(
            "customer.subscription.created",
            json!({
                "id": "sub_1",
                "status": "trialing",
                "current_period_start": 1704067200,
                "current_period_end": 1706745600,
                "metadata": {"user_id": "user-1", "plan_type": "accelerated"}
            }),
        );

        reconciler.handle(&event).await.unwrap();

        let record = store.find_by_user_id(&user("user-1")).await.unwrap().unwrap();
        assert_eq!(record.status, SubscriptionStatus::Trialing);
        assert_eq!(record.plan_type, Some(PlanType::Accelerated));
        assert_eq!(
            record.current_period_start.unwrap().unix_seconds(),
            1704067200
        );
        assert_eq!(record.current_period_end.unwrap().unix_seconds(), 1706745600);
    }

    #[tokio::test]
    async fn created_without_user_metadata_is_skipped() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());

        let event = subscription_event(
            "customer.subscription.created",
            json!({"id": "sub_1", "status": "active"}),
        );

        let outcome = reconciler.handle(&event).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
    }

    // ── Subscription updated ─────────────────────────────────────────

    #[tokio::test]
    async fn updated_resolves_by_subscription_id_without_metadata() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());

        // Attach a subscription first
        reconciler
            .handle(&checkout_event("user-1", "steady", "sub_1"))
            .await
            .unwrap();

        let event = subscription_event(
            "customer.subscription.updated",
            json!({
                "id": "sub_1",
                "status": "past_due",
                "current_period_start": 1704067200,
                "current_period_end": 1706745600
            }),
        );

        let outcome = reconciler.handle(&event).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::Applied);

        let record = store.find_by_user_id(&user("user-1")).await.unwrap().unwrap();
        assert_eq!(record.status, SubscriptionStatus::PastDue);
        // Plan is never touched by updates
        assert_eq!(record.plan_type, Some(PlanType::Steady));
    }

    #[tokio::test]
    async fn updated_for_foreign_subscription_is_silent_noop() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());

        let event = subscription_event(
            "customer.subscription.updated",
            json!({"id": "sub_unknown", "status": "active"}),
        );

        let outcome = reconciler.handle(&event).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
    }

    // ── Subscription deleted ─────────────────────────────────────────

    #[tokio::test]
    async fn deleted_sets_canceled_and_keeps_other_fields() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());
        reconciler
            .handle(&checkout_event("user-1", "steady", "sub_1"))
            .await
            .unwrap();

        let event = subscription_event(
            "customer.subscription.deleted",
            json!({"id": "sub_1", "status": "canceled", "metadata": {"user_id": "user-1"}}),
        );
        reconciler.handle(&event).await.unwrap();

        let record = store.find_by_user_id(&user("user-1")).await.unwrap().unwrap();
        assert_eq!(record.status, SubscriptionStatus::Canceled);
        assert_eq!(record.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(record.plan_type, Some(PlanType::Steady));
    }

    // ── Invoice events ───────────────────────────────────────────────

    #[tokio::test]
    async fn payment_succeeded_reactivates_by_subscription_id() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());
        reconciler
            .handle(&checkout_event("user-1", "steady", "sub_1"))
            .await
            .unwrap();

        // Simulate a past-due record recovering
        let failed = subscription_event(
            "invoice.payment_failed",
            json!({"id": "in_1", "subscription": "sub_1"}),
        );
        reconciler.handle(&failed).await.unwrap();
        assert_eq!(
            store.find_by_user_id(&user("user-1")).await.unwrap().unwrap().status,
            SubscriptionStatus::PastDue
        );

        let succeeded = subscription_event(
            "invoice.payment_succeeded",
            json!({"id": "in_2", "subscription": "sub_1"}),
        );
        reconciler.handle(&succeeded).await.unwrap();
        assert_eq!(
            store.find_by_user_id(&user("user-1")).await.unwrap().unwrap().status,
            SubscriptionStatus::Active
        );
    }

    #[tokio::test]
    async fn payment_failed_for_unknown_subscription_does_not_error() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());

        let event = subscription_event(
            "invoice.payment_failed",
            json!({"id": "in_1", "subscription": "sub_missing"}),
        );

        let outcome = reconciler.handle(&event).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_skipped() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());

        let event = subscription_event("invoice.payment_succeeded", json!({"id": "in_1"}));
        let outcome = reconciler.handle(&event).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
    }

    // ── Idempotency across event pairs ───────────────────────────────

    #[tokio::test]
    async fn checkout_then_update_is_idempotent_in_either_repetition() {
        let store = store_with_user("user-1").await;
        let reconciler = SubscriptionReconciler::new(store.clone());

        let checkout = checkout_event("user-1", "steady", "sub_1");
        let update = subscription_event(
            "customer.subscription.updated",
            json!({
                "id": "sub_1",
                "status": "active",
                "current_period_start": 1704067200,
                "current_period_end": 1706745600
            }),
        );

        reconciler.handle(&checkout).await.unwrap();
        reconciler.handle(&update).await.unwrap();
        let once = store.find_by_user_id(&user("user-1")).await.unwrap().unwrap();

        reconciler.handle(&checkout).await.unwrap();
        reconciler.handle(&update).await.unwrap();
        let twice = store.find_by_user_id(&user("user-1")).await.unwrap().unwrap();

        assert_eq!(once.status, twice.status);
        assert_eq!(once.subscription_id, twice.subscription_id);
        assert_eq!(once.plan_type, twice.plan_type);
        assert_eq!(once.current_period_start, twice.current_period_start);
        assert_eq!(once.current_period_end, twice.current_period_end);
    }
}
