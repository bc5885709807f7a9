//! In-memory implementation of `SubscriptionEventLog`.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{SubscriptionEventLog, SubscriptionEventRecord};

/// Process-local append-only event log.
pub struct InMemoryEventLog {
    records: RwLock<Vec<SubscriptionEventRecord>>,
    fail_appends: bool,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            fail_appends: false,
        }
    }

    /// A log whose appends always fail, for exercising swallow paths.
    pub fn failing() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            fail_appends: true,
        }
    }

    /// Snapshot of all records in append order.
    pub async fn records(&self) -> Vec<SubscriptionEventRecord> {
        self.records.read().await.clone()
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionEventLog for InMemoryEventLog {
    async fn append(&self, record: SubscriptionEventRecord) -> Result<(), DomainError> {
        if self.fail_appends {
            return Err(DomainError::database("simulated append failure"));
        }
        self.records.write().await.push(record);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &UserId) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.user_id.as_ref() != Some(user_id));
        Ok((before - records.len()) as u64)
    }
}
