//! ManageSubscriptionHandler - cancel, reactivate, billing portal.
//!
//! Cancellation sets the provider's cancel-at-period-end flag; access is
//! only revoked when the provider later delivers the deletion webhook.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::billing::BillingError;
use crate::domain::foundation::UserId;
use crate::ports::{PaymentProvider, ProviderSubscription, SubscriptionStore};

/// Fallback portal return path when the caller does not supply one.
const DEFAULT_RETURN_URL: &str = "/app/profile";

/// Subscription management actions exposed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManageAction {
    Cancel,
    Reactivate,
    GetPortalUrl,
}

/// Command to manage the caller's subscription.
#[derive(Debug, Clone)]
pub struct ManageSubscriptionCommand {
    pub user_id: UserId,
    pub action: ManageAction,
    pub return_url: Option<String>,
}

/// Result of a management action.
#[derive(Debug, Clone)]
pub struct ManageSubscriptionResult {
    pub message: Option<String>,
    pub url: Option<String>,
    pub subscription: Option<ProviderSubscription>,
}

/// Handler for subscription management.
pub struct ManageSubscriptionHandler {
    store: Arc<dyn SubscriptionStore>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl ManageSubscriptionHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>, payment_provider: Arc<dyn PaymentProvider>) -> Self {
        Self {
            store,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: ManageSubscriptionCommand,
    ) -> Result<ManageSubscriptionResult, BillingError> {
        let record = self
            .store
            .find_by_user_id(&cmd.user_id)
            .await?
            .ok_or(BillingError::RecordNotFound)?;

        // Every action needs a billing customer; only portal creation can
        // work without a subscription.
        let customer_id = record
            .billing_customer_id
            .as_deref()
            .ok_or(BillingError::NoBillingCustomer)?;

        match cmd.action {
            ManageAction::Cancel => {
                let subscription_id = record
                    .subscription_id
                    .as_deref()
                    .ok_or(BillingError::NoSubscription)?;

                let subscription = self
                    .payment_provider
                    .set_cancel_at_period_end(subscription_id, true)
                    .await
                    .map_err(|e| BillingError::Provider(e.to_string()))?;

                tracing::info!(
                    user_id = %cmd.user_id,
                    subscription_id = %subscription_id,
                    "Subscription set to cancel at period end"
                );

                Ok(ManageSubscriptionResult {
                    message: Some(
                        "Subscription will be canceled at the end of the current period"
                            .to_string(),
                    ),
                    url: None,
                    subscription: Some(subscription),
                })
            }

            ManageAction::Reactivate => {
                let subscription_id = record
                    .subscription_id
                    .as_deref()
                    .ok_or(BillingError::NoSubscription)?;

                let subscription = self
                    .payment_provider
                    .set_cancel_at_period_end(subscription_id, false)
                    .await
                    .map_err(|e| BillingError::Provider(e.to_string()))?;

                tracing::info!(
                    user_id = %cmd.user_id,
                    subscription_id = %subscription_id,
                    "Subscription reactivated"
                );

                Ok(ManageSubscriptionResult {
                    message: Some("Subscription reactivated".to_string()),
                    url: None,
                    subscription: Some(subscription),
                })
            }

            ManageAction::GetPortalUrl => {
                let return_url = cmd.return_url.as_deref().unwrap_or(DEFAULT_RETURN_URL);

                let portal = self
                    .payment_provider
                    .create_portal_session(customer_id, return_url)
                    .await
                    .map_err(|e| BillingError::Provider(e.to_string()))?;

                Ok(ManageSubscriptionResult {
                    message: None,
                    url: Some(portal.url),
                    subscription: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::adapters::stripe::MockPaymentGateway;
    use crate::domain::billing::{SubscriptionRecord, SubscriptionStatus};
    use crate::domain::foundation::Timestamp;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn subscribed_record() -> SubscriptionRecord {
        SubscriptionRecord {
            user_id: user("user-1"),
            billing_customer_id: Some("cus_1".to_string()),
            subscription_id: Some("sub_1".to_string()),
            plan_type: None,
            status: SubscriptionStatus::Active,
            current_period_start: None,
            current_period_end: None,
            updated_at: Timestamp::now(),
        }
    }

    fn command(action: ManageAction) -> ManageSubscriptionCommand {
        ManageSubscriptionCommand {
            user_id: user("user-1"),
            action,
            return_url: None,
        }
    }

    async fn fixture(
        record: SubscriptionRecord,
    ) -> (ManageSubscriptionHandler, Arc<MockPaymentGateway>) {
        let store = Arc::new(InMemorySubscriptionStore::new());
        store.insert_record(record).await;
        let gateway = Arc::new(MockPaymentGateway::new());
        (
            ManageSubscriptionHandler::new(store, gateway.clone()),
            gateway,
        )
    }

    #[tokio::test]
    async fn cancel_sets_period_end_flag() {
        let (handler, gateway) = fixture(subscribed_record()).await;

        let result = handler.handle(command(ManageAction::Cancel)).await.unwrap();

        assert_eq!(gateway.last_cancel_flag(), Some(("sub_1".to_string(), true)));
        assert!(result.message.unwrap().contains("end of the current period"));
        assert!(result.subscription.unwrap().cancel_at_period_end);
    }

    #[tokio::test]
    async fn reactivate_clears_period_end_flag() {
        let (handler, gateway) = fixture(subscribed_record()).await;

        let result = handler.handle(command(ManageAction::Reactivate)).await.unwrap();

        assert_eq!(gateway.last_cancel_flag(), Some(("sub_1".to_string(), false)));
        assert_eq!(result.message.as_deref(), Some("Subscription reactivated"));
    }

    #[tokio::test]
    async fn portal_url_works_without_subscription() {
        let mut record = subscribed_record();
        record.subscription_id = None;
        let (handler, _) = fixture(record).await;

        let result = handler.handle(command(ManageAction::GetPortalUrl)).await.unwrap();

        assert!(result.url.unwrap().contains("billing"));
        assert!(result.subscription.is_none());
    }

    #[tokio::test]
    async fn cancel_without_subscription_fails() {
        let mut record = subscribed_record();
        record.subscription_id = None;
        let (handler, gateway) = fixture(record).await;

        let result = handler.handle(command(ManageAction::Cancel)).await;

        assert!(matches!(result, Err(BillingError::NoSubscription)));
        assert!(gateway.last_cancel_flag().is_none());
    }

    #[tokio::test]
    async fn missing_customer_fails_every_action() {
        let mut record = subscribed_record();
        record.billing_customer_id = None;
        let (handler, _) = fixture(record.clone()).await;

        for action in [ManageAction::Cancel, ManageAction::Reactivate, ManageAction::GetPortalUrl] {
            let result = handler.handle(command(action)).await;
            assert!(matches!(result, Err(BillingError::NoBillingCustomer)));
        }
    }

    #[tokio::test]
    async fn portal_uses_supplied_return_url() {
        let (handler, gateway) = fixture(subscribed_record()).await;

        let cmd = ManageSubscriptionCommand {
            user_id: user("user-1"),
            action: ManageAction::GetPortalUrl,
            return_url: Some("https://app.example.com/settings".to_string()),
        };
        handler.handle(cmd).await.unwrap();

        assert_eq!(
            gateway.last_portal_return_url().as_deref(),
            Some("https://app.example.com/settings")
        );
    }

    #[tokio::test]
    async fn action_strings_deserialize_like_the_wire_format() {
        assert_eq!(
            serde_json::from_str::<ManageAction>("\"cancel\"").unwrap(),
            ManageAction::Cancel
        );
        assert_eq!(
            serde_json::from_str::<ManageAction>("\"get_portal_url\"").unwrap(),
            ManageAction::GetPortalUrl
        );
        assert!(serde_json::from_str::<ManageAction>("\"upgrade\"").is_err());
    }
}
