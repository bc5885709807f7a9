//! Subscription record and status for a single user.
//!
//! One `SubscriptionRecord` exists per application user. It is owned
//! exclusively by the reconciler; every webhook handler writes only the
//! narrow field set its event type is responsible for, expressed as a
//! `SubscriptionPatch`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::plan::PlanType;

/// Subscription status as tracked in the user's record.
///
/// Mirrors the provider's subscription statuses, plus `Inactive` for users
/// who never subscribed. Unknown provider strings parse to `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Inactive,
}

impl SubscriptionStatus {
    /// Parses a provider status string.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            _ => Self::Inactive,
        }
    }

    /// Returns the stored string form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Inactive => "inactive",
        }
    }
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::Inactive
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable subscription state for one application user.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    /// Owning user; immutable.
    pub user_id: UserId,

    /// Provider customer id, assigned on first checkout. Set at most once.
    pub billing_customer_id: Option<String>,

    /// Provider subscription id for the current subscription.
    pub subscription_id: Option<String>,

    /// Plan chosen at checkout.
    pub plan_type: Option<PlanType>,

    /// Current subscription status.
    pub status: SubscriptionStatus,

    /// Start of the active billing cycle.
    pub current_period_start: Option<Timestamp>,

    /// End of the active billing cycle.
    pub current_period_end: Option<Timestamp>,

    /// Bumped on every mutation.
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// Creates a fresh record for a user with no subscription history.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            billing_customer_id: None,
            subscription_id: None,
            plan_type: None,
            status: SubscriptionStatus::Inactive,
            current_period_start: None,
            current_period_end: None,
            updated_at: Timestamp::now(),
        }
    }

    /// True when the subscription currently blocks account deletion.
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Applies a narrow-field patch, bumping `updated_at`.
    ///
    /// Only fields present in the patch are written; everything else is left
    /// untouched. Applying the same patch twice yields the same record.
    pub fn apply(&mut self, patch: &SubscriptionPatch, now: Timestamp) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(subscription_id) = &patch.subscription_id {
            self.subscription_id = Some(subscription_id.clone());
        }
        if let Some(plan_type) = patch.plan_type {
            self.plan_type = Some(plan_type);
        }
        if let Some(period_start) = patch.current_period_start {
            self.current_period_start = Some(period_start);
        }
        if let Some(period_end) = patch.current_period_end {
            self.current_period_end = Some(period_end);
        }
        self.updated_at = now;
    }
}

/// Key for locating the subscription record a webhook event targets.
///
/// Checkout and creation events carry the user id in metadata; invoice
/// events only carry the provider subscription id, so the record must be
/// resolvable by either key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    ByUser(UserId),
    BySubscription(String),
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByUser(user_id) => write!(f, "user {}", user_id),
            Self::BySubscription(subscription_id) => {
                write!(f, "subscription {}", subscription_id)
            }
        }
    }
}

/// Narrow-field update produced by one webhook handler.
///
/// Each event type owns a disjoint field set (aside from `status`), which is
/// what makes re-application and concurrent delivery safe without locking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionPatch {
    pub status: Option<SubscriptionStatus>,
    pub subscription_id: Option<String>,
    pub plan_type: Option<PlanType>,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
}

impl SubscriptionPatch {
    /// Patch that only writes a status.
    pub fn status_only(status: SubscriptionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// True when the patch writes nothing.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.subscription_id.is_none()
            && self.plan_type.is_none()
            && self.current_period_start.is_none()
            && self.current_period_end.is_none()
    }
}
