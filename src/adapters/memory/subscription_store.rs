//! In-memory implementation of `SubscriptionStore`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{RecordKey, SubscriptionPatch, SubscriptionRecord};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{ApplyOutcome, SubscriptionStore};

/// Process-local subscription store keyed by user id.
pub struct InMemorySubscriptionStore {
    records: RwLock<HashMap<UserId, SubscriptionRecord>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds an empty record for a user, as profile onboarding would.
    pub async fn insert_user(&self, user_id: UserId) {
        let mut records = self.records.write().await;
        records.insert(user_id.clone(), SubscriptionRecord::new(user_id));
    }

    /// Seeds a fully-specified record.
    pub async fn insert_record(&self, record: SubscriptionRecord) {
        let mut records = self.records.write().await;
        records.insert(record.user_id.clone(), record);
    }

    /// Removes a user's record, as the deletion cascade would.
    pub async fn remove_user(&self, user_id: &UserId) -> bool {
        self.records.write().await.remove(user_id).is_some()
    }
}

impl Default for InMemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(user_id).cloned())
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.subscription_id.as_deref() == Some(subscription_id))
            .cloned())
    }

    async fn apply(
        &self,
        key: &RecordKey,
        patch: SubscriptionPatch,
    ) -> Result<ApplyOutcome, DomainError> {
        let mut records = self.records.write().await;

        let record = match key {
            RecordKey::ByUser(user_id) => records.get_mut(user_id),
            RecordKey::BySubscription(subscription_id) => records
                .values_mut()
                .find(|r| r.subscription_id.as_deref() == Some(subscription_id.as_str())),
        };

        match record {
            Some(record) => {
                record.apply(&patch, Timestamp::now());
                Ok(ApplyOutcome::Applied)
            }
            None => Ok(ApplyOutcome::NoMatch),
        }
    }

    async fn set_billing_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(user_id) {
            // Set-once: the first persisted id wins
            if record.billing_customer_id.is_none() {
                record.billing_customer_id = Some(customer_id.to_string());
                record.updated_at = Timestamp::now();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionStatus;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn find_returns_none_for_unknown_user() {
        let store = InMemorySubscriptionStore::new();
        assert!(store.find_by_user_id(&user("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn apply_by_user_updates_record() {
        let store = InMemorySubscriptionStore::new();
        store.insert_user(user("u1")).await;

        let outcome = store
            .apply(
                &RecordKey::ByUser(user("u1")),
                SubscriptionPatch::status_only(SubscriptionStatus::Active),
            )
            .await
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Applied);
        let record = store.find_by_user_id(&user("u1")).await.unwrap().unwrap();
        assert_eq!(record.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn apply_missing_key_reports_no_match() {
        let store = InMemorySubscriptionStore::new();
        let outcome = store
            .apply(
                &RecordKey::BySubscription("sub_x".to_string()),
                SubscriptionPatch::status_only(SubscriptionStatus::Canceled),
            )
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::NoMatch);
    }

    #[tokio::test]
    async fn lookup_by_subscription_id_after_patch() {
        let store = InMemorySubscriptionStore::new();
        store.insert_user(user("u1")).await;
        store
            .apply(
                &RecordKey::ByUser(user("u1")),
                SubscriptionPatch {
                    subscription_id: Some("sub_1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let record = store.find_by_subscription_id("sub_1").await.unwrap().unwrap();
        assert_eq!(record.user_id, user("u1"));
    }

    #[tokio::test]
    async fn customer_id_is_set_once() {
        let store = InMemorySubscriptionStore::new();
        store.insert_user(user("u1")).await;

        store.set_billing_customer_id(&user("u1"), "cus_first").await.unwrap();
        store.set_billing_customer_id(&user("u1"), "cus_second").await.unwrap();

        let record = store.find_by_user_id(&user("u1")).await.unwrap().unwrap();
        assert_eq!(record.billing_customer_id.as_deref(), Some("cus_first"));
    }
}
