//! Subscription plan types and pricing.
//!
//! The pricing table is static: three monthly plans, each mapping to a
//! provider price reference and an amount in minor currency units.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Subscription plan offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Sustainable pace, the default recommendation.
    Steady,
    /// Aggressive deficit for committed users.
    Intensive,
    /// Fastest pace the app supports.
    Accelerated,
}

impl PlanType {
    /// Parses a plan type from its wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "steady" => Some(Self::Steady),
            "intensive" => Some(Self::Intensive),
            "accelerated" => Some(Self::Accelerated),
            _ => None,
        }
    }

    /// Returns the wire representation of the plan type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Steady => "steady",
            Self::Intensive => "intensive",
            Self::Accelerated => "accelerated",
        }
    }

    /// Returns the pricing entry for this plan.
    pub fn pricing(&self) -> &'static PlanPricing {
        &PLAN_PRICING[self]
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pricing details for a plan.
#[derive(Debug, Clone)]
pub struct PlanPricing {
    /// Provider price reference for this plan.
    pub price_id: &'static str,
    /// Monthly amount in cents.
    pub amount_cents: u32,
    /// Display name shown at checkout.
    pub name: &'static str,
    /// Marketing description shown at checkout.
    pub description: &'static str,
}

/// Static pricing table, one entry per plan.
static PLAN_PRICING: Lazy<HashMap<PlanType, PlanPricing>> = Lazy::new(|| {
    HashMap::from([
        (
            PlanType::Steady,
            PlanPricing {
                price_id: "price_steady_monthly",
                amount_cents: 999,
                name: "Steady Plan",
                description: "Best combination of visible results and sustainable progress",
            },
        ),
        (
            PlanType::Intensive,
            PlanPricing {
                price_id: "price_intensive_monthly",
                amount_cents: 1499,
                name: "Intensive Plan",
                description: "Challenge mode. Maximum results for those ready to commit",
            },
        ),
        (
            PlanType::Accelerated,
            PlanPricing {
                price_id: "price_accelerated_monthly",
                amount_cents: 1999,
                name: "Accelerated Plan",
                description: "For the ambitious. Faster results and greater momentum",
            },
        ),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_plans() {
        assert_eq!(PlanType::parse("steady"), Some(PlanType::Steady));
        assert_eq!(PlanType::parse("intensive"), Some(PlanType::Intensive));
        assert_eq!(PlanType::parse("accelerated"), Some(PlanType::Accelerated));
    }

    #[test]
    fn parse_unknown_plan_fails() {
        assert_eq!(PlanType::parse("premium"), None);
        assert_eq!(PlanType::parse(""), None);
        assert_eq!(PlanType::parse("Steady"), None);
    }

    #[test]
    fn as_str_round_trips() {
        for plan in [PlanType::Steady, PlanType::Intensive, PlanType::Accelerated] {
            assert_eq!(PlanType::parse(plan.as_str()), Some(plan));
        }
    }

    #[test]
    fn pricing_table_covers_every_plan() {
        assert_eq!(PlanType::Steady.pricing().amount_cents, 999);
        assert_eq!(PlanType::Intensive.pricing().amount_cents, 1499);
        assert_eq!(PlanType::Accelerated.pricing().amount_cents, 1999);
    }

    #[test]
    fn pricing_entries_reference_monthly_prices() {
        for plan in [PlanType::Steady, PlanType::Intensive, PlanType::Accelerated] {
            assert!(plan.pricing().price_id.ends_with("_monthly"));
            assert!(!plan.pricing().name.is_empty());
        }
    }

    #[test]
    fn serde_uses_lowercase_wire_format() {
        let json = serde_json::to_string(&PlanType::Accelerated).unwrap();
        assert_eq!(json, "\"accelerated\"");
        let parsed: PlanType = serde_json::from_str("\"steady\"").unwrap();
        assert_eq!(parsed, PlanType::Steady);
    }
}
