use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Provider-reported subscription state. Closed set, backed by a CHECK
/// constraint in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    Canceled,
    PastDue,
    Incomplete,
    Unpaid,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::Canceled => "canceled",
            Self::PastDue => "past_due",
            Self::Incomplete => "incomplete",
            Self::Unpaid => "unpaid",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "trialing" => Ok(Self::Trialing),
            "canceled" => Ok(Self::Canceled),
            "past_due" => Ok(Self::PastDue),
            "incomplete" => Ok(Self::Incomplete),
            "unpaid" => Ok(Self::Unpaid),
            "expired" => Ok(Self::Expired),
            _ => Err(()),
        }
    }
}

/// One row per provider-assigned subscription id. Never deleted - only
/// status-transitioned. Mutable fields are overwritten wholesale by each
/// incoming event (last-write-wins; no cross-event ordering is assumed).
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub subscription_id: String,
    pub user_id: String,
    pub customer_id: String,
    /// Internal tier id when the provider's product id resolves, otherwise
    /// the raw provider id.
    pub product_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub canceled_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for the reconciler's subscription upsert.
#[derive(Debug, Clone)]
pub struct UpsertSubscription {
    pub subscription_id: String,
    pub user_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub canceled_at: Option<i64>,
}
